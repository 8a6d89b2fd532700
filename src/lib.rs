//! Per-frontend header rewriting for an HTTP reverse proxy.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod routing;
pub mod service_map;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rewrite::{HeaderRewriter, RewriteError, RewritePlan};
pub use service_map::{CowServiceMap, ServiceLookup};

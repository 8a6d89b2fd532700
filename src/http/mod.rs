//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, frontend lookup)
//!     → rewrite engine (request headers: global, then per service)
//!     → forward to the frontend's backend
//!     → rewrite engine (response headers: global)
//!     → Send to client
//! ```

pub mod middleware;
pub mod server;

pub use middleware::headers::{HeaderRewriteLayer, HeaderRewriteService};
pub use server::HttpServer;

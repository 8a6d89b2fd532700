//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (frontend lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Frontend (backend + header rewriter) or NoMatch
//!
//! Frontend Compilation (at startup and on reload):
//!     FrontendConfig[]
//!     → Compile matchers and rewrite plans
//!     → Sort by priority
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Frontends compiled up front, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod router;

pub use router::{Frontend, Router};

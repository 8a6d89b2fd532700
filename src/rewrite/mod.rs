//! Per-frontend header rewriting.
//!
//! # Data Flow
//! ```text
//! FrontendConfig.headers
//!     → delta.rs (compile name/value tables)
//!     → plan.rs (immutable RewritePlan, or nothing when unconfigured)
//!     → engine.rs (HeaderRewriter: request + response mutation)
//!
//! Per request:
//!     global request delta → service lookup → service delta → next stage
//! Per response:
//!     global response delta
//! ```
//!
//! # Design Decisions
//! - Empty value deletes, non-empty value overwrites
//! - Service rules run after global rules and therefore win
//! - Service rules exist for requests only
//! - Plans are never mutated; a config reload builds new ones

pub mod delta;
pub mod engine;
pub mod plan;

pub use delta::{DeltaOp, Direction, HeaderDelta, InvalidHeader};
pub use engine::{HeaderRewriter, RewriteError};
pub use plan::RewritePlan;

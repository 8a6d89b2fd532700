//! Tower middleware.

pub mod headers;

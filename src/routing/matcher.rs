//! Frontend matching conditions.
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port
//! - Path matching is case-sensitive
//! - No conditions = always matches (wildcard)

use axum::http::{header, Request};

use crate::service_map::normalize_hostname;

/// Condition a request must satisfy to reach a frontend.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Host header (or URI authority) equals this hostname.
    Host(String),
    /// Request path starts with this prefix.
    PathPrefix(String),
    /// Every inner condition holds.
    All(Vec<Matcher>),
}

impl Matcher {
    pub fn host(host: &str) -> Self {
        Matcher::Host(normalize_hostname(host))
    }

    pub fn path_prefix(prefix: impl Into<String>) -> Self {
        Matcher::PathPrefix(prefix.into())
    }

    /// Build the matcher for an optional host and path prefix.
    pub fn for_frontend(host: Option<&str>, path_prefix: Option<&str>) -> Self {
        let mut conditions = Vec::new();
        if let Some(host) = host {
            conditions.push(Matcher::host(host));
        }
        if let Some(prefix) = path_prefix {
            conditions.push(Matcher::path_prefix(prefix));
        }
        Matcher::All(conditions)
    }

    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        match self {
            Matcher::Host(expected) => req
                .uri()
                .host()
                .or_else(|| req.headers().get(header::HOST).and_then(|h| h.to_str().ok()))
                .map(|h| normalize_hostname(h) == *expected)
                .unwrap_or(false),
            Matcher::PathPrefix(prefix) => req.uri().path().starts_with(prefix.as_str()),
            Matcher::All(matchers) => matchers.iter().all(|m| m.matches(req)),
        }
    }
}

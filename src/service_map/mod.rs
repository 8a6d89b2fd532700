//! Hostname → service resolution.
//!
//! # Data Flow
//! ```text
//! Control plane (config reload, service discovery)
//!     → CowServiceMap::replace / insert / remove   (writer side)
//!
//! Per request:
//!     rewrite engine → ServiceLookup::get(hostname) (reader side)
//! ```
//!
//! # Design Decisions
//! - The rewrite engine only sees the `ServiceLookup` trait
//! - Readers never block on writers and never observe a partial entry
//! - Hostnames are case-insensitive; a trailing `:port` is ignored

pub mod cow;

use dashmap::DashMap;

pub use cow::CowServiceMap;

/// Read side of the hostname → service mapping.
pub trait ServiceLookup: Send + Sync {
    /// Returns the service currently assigned to `hostname`, if any.
    fn get(&self, hostname: &str) -> Option<String>;

    /// Number of mapped hostnames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ServiceLookup for DashMap<String, String> {
    fn get(&self, hostname: &str) -> Option<String> {
        DashMap::get(self, &normalize_hostname(hostname)).map(|r| r.value().clone())
    }

    fn len(&self) -> usize {
        DashMap::len(self)
    }
}

/// Lowercase `hostname` and strip a trailing port.
///
/// IPv6 literals keep their brackets: `[::1]:8080` → `[::1]`.
pub fn normalize_hostname(hostname: &str) -> String {
    let host = if hostname.starts_with('[') {
        match hostname.find(']') {
            Some(end) => &hostname[..=end],
            None => hostname,
        }
    } else {
        match hostname.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            _ => hostname,
        }
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

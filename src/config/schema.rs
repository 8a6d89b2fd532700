//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Frontend definitions: routing rules plus header rewrites.
    pub frontends: Vec<FrontendConfig>,

    /// Initial hostname → service name mapping.
    ///
    /// Shared by every frontend. Replaced wholesale on config reload.
    pub service_mapping: BTreeMap<String, String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A routed frontend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrontendConfig {
    /// Frontend identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match, case-insensitive).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Backend address to forward to (e.g., "127.0.0.1:3000").
    pub backend: String,

    /// Frontend priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,

    /// Custom header rules. Absent means the rewrite stage is skipped.
    #[serde(default)]
    pub headers: Option<HeadersConfig>,
}

/// Custom header rules of a frontend.
///
/// In every table an empty value deletes the header, any other value sets it.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HeadersConfig {
    /// Applied to every request.
    pub custom_request_headers: BTreeMap<String, String>,

    /// Applied to every response.
    pub custom_response_headers: BTreeMap<String, String>,

    /// Service name → request headers, applied after `custom_request_headers`
    /// when the request hostname resolves to that service.
    pub custom_service_headers: BTreeMap<String, BTreeMap<String, String>>,
}

impl HeadersConfig {
    /// Returns true if any global request or response header is declared.
    pub fn has_custom_headers_defined(&self) -> bool {
        !self.custom_request_headers.is_empty() || !self.custom_response_headers.is_empty()
    }

    /// Returns true if no table declares anything.
    pub fn is_empty(&self) -> bool {
        !self.has_custom_headers_defined()
            && self.custom_service_headers.values().all(BTreeMap::is_empty)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by frontend, status
//! - `proxy_request_duration_seconds` (histogram): latency by frontend
//! - `proxy_header_mutations_total` (counter): header rules applied by direction, operation
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(frontend: &str, status: u16, start: Instant) {
    let frontend = frontend.to_string();
    counter!(
        "proxy_requests_total",
        "frontend" => frontend.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "frontend" => frontend)
        .record(start.elapsed().as_secs_f64());
}

/// Record one applied header rule.
pub fn record_header_mutation(direction: &'static str, op: &'static str) {
    counter!(
        "proxy_header_mutations_total",
        "direction" => direction,
        "op" => op
    )
    .increment(1);
}

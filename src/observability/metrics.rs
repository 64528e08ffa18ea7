//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cors_proxy_requests_total` (counter): requests by method, outcome, status
//! - `cors_proxy_request_duration_seconds` (histogram): time until the
//!   response head was ready (bodies stream afterwards)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(method: &str, outcome: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "cors_proxy_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("cors_proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `switchyard_requests_total` (counter): requests by method, status, route
//! - `switchyard_request_duration_seconds` (histogram): latency distribution
//! - `switchyard_requests_limited_total` (counter): requests turned away by the
//!   per-client concurrency limiter

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "switchyard_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "switchyard_request_duration_seconds";
pub const REQUESTS_LIMITED_TOTAL: &str = "switchyard_requests_limited_total";

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    metrics::counter!(REQUESTS_TOTAL, &labels).increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, &labels).record(start.elapsed().as_secs_f64());
}

/// Record a request rejected by the concurrency limiter.
pub fn record_limited() {
    metrics::counter!(REQUESTS_LIMITED_TOTAL).increment(1);
}

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bff_requests_total` (counter): requests by method, status, action
//! - `bff_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - The `metrics` facade keeps call sites cheap; the Prometheus
//!   exporter is installed once at startup when enabled
//! - Exporter failure is logged and the process keeps serving

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, action: &str, start: Instant) {
    metrics::counter!(
        "bff_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "action" => action.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "bff_request_duration_seconds",
        "method" => method.to_string(),
        "action" => action.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

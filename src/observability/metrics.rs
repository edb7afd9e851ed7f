//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rejections_total` (counter): CORS and rate-limit drops
//! - `gateway_dependency_healthy` (gauge): 1=healthy, 0=not
//!
//! # Design Decisions
//! - Prometheus exposition on a separate listener, off the request path
//! - Updates are cheap atomic operations; recording never fails a request

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed (or normalized) request.
pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("service", service.to_string()),
    ];
    counter!("gateway_requests_total", &labels[..]).increment(1);
    histogram!("gateway_request_duration_seconds", &labels[..])
        .record(start.elapsed().as_secs_f64());
}

/// Record a request dropped before routing (CORS or rate limit).
pub fn record_rejection(reason: &'static str) {
    counter!("gateway_rejections_total", "reason" => reason).increment(1);
}

/// Record the latest health observation for a dependency.
pub fn record_dependency_health(service: &str, healthy: bool) {
    gauge!("gateway_dependency_healthy", "service" => service.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, rate limiting, route table)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, route, status
//! - `gateway_request_duration_seconds` (histogram): latency through the filter chain
//! - `gateway_rate_limited_total` (counter): requests rejected by a rate limiter
//! - `gateway_route_compile_failures_total` (counter): definitions dropped at refresh
//! - `gateway_routes_active` (gauge): routes in the current snapshot
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Labels are route ids, never raw paths, to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route_id: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route_id.to_string()),
        ("status", status.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(route_id: &str) {
    counter!("gateway_rate_limited_total", "route" => route_id.to_string()).increment(1);
}

pub fn record_route_compile_failure(route_id: &str) {
    counter!("gateway_route_compile_failures_total", "route" => route_id.to_string()).increment(1);
}

pub fn set_routes_active(count: usize) {
    gauge!("gateway_routes_active").set(count as f64);
}

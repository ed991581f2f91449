//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Route engine produces:
//!     → logging.rs (compile failures, refreshes, rejections, upstream errors)
//!     → metrics.rs
//!         - Metrics global filter: requests_total, request_duration_seconds
//!         - RequestRateLimiter: rate_limited_total
//!         - compiler / cache: route_compile_failures_total, routes_active
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape on metrics_address
//! ```
//!
//! # Design Decisions
//! - Request ID is attached to chain log events as a field
//! - Metric labels carry the route id, never the raw path
//! - Without an installed exporter the metric macros are no-ops

pub mod logging;
pub mod metrics;

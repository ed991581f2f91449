//! Process-wide filters applied to every route.
//!
//! # Data Flow
//! ```text
//! metrics.rs        (i32::MIN)  time the whole chain, record outcome
//! ...route filters  (1..n)
//! route_to_url.rs   (10000)     route URI + request path → request URL
//! load_balancer.rs  (10100)     lb://service → http://instance
//! routing.rs        (i32::MAX)  forward upstream, write response
//! ```

pub mod load_balancer;
pub mod metrics;
pub mod route_to_url;
pub mod routing;

use std::sync::Arc;

use super::{GatewayFilter, OrderedFilter};
use crate::config::TimeoutConfig;
use crate::load_balancer::LoadBalancerClient;

pub use load_balancer::LoadBalancerClientFilter;
pub use metrics::MetricsFilter;
pub use route_to_url::RouteToRequestUrlFilter;
pub use routing::{HttpRoutingFilter, UpstreamClient};

pub const METRICS_FILTER_ORDER: i32 = i32::MIN;
pub const ROUTE_TO_URL_FILTER_ORDER: i32 = 10000;
pub const LOAD_BALANCER_CLIENT_FILTER_ORDER: i32 = 10100;
pub const ROUTING_FILTER_ORDER: i32 = i32::MAX;

/// Wrap a global filter; filters without an order sort last.
pub fn global(filter: Arc<dyn GatewayFilter>) -> OrderedFilter {
    OrderedFilter::with_default_order(filter, i32::MAX)
}

/// The standard global filter set.
pub fn default_global_filters(
    load_balancer: Arc<LoadBalancerClient>,
    timeouts: &TimeoutConfig,
) -> Vec<OrderedFilter> {
    vec![
        global(Arc::new(MetricsFilter)),
        global(Arc::new(RouteToRequestUrlFilter)),
        global(Arc::new(LoadBalancerClientFilter::new(load_balancer))),
        global(Arc::new(HttpRoutingFilter::new(UpstreamClient::new(timeouts)))),
    ]
}

//! Combine the route target with the request path.

use async_trait::async_trait;

use super::ROUTE_TO_URL_FILTER_ORDER;
use crate::error::GatewayResult;
use crate::filter::{GatewayFilter, GatewayFilterChain};
use crate::http::ServerExchange;

/// Scheme, host and port come from the route URI; path and query from the
/// (possibly rewritten) request.
#[derive(Debug, Default)]
pub struct RouteToRequestUrlFilter;

#[async_trait]
impl GatewayFilter for RouteToRequestUrlFilter {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        if let Some(route) = exchange.route() {
            let mut url = route.uri().clone();
            url.set_path(exchange.request.path());
            url.set_query(exchange.request.query());
            tracing::trace!(route_id = %route.id(), url = %url, "Resolved request url");
            exchange.attributes.request_url = Some(url);
        }
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "RouteToRequestUrl"
    }

    fn order(&self) -> Option<i32> {
        Some(ROUTE_TO_URL_FILTER_ORDER)
    }
}

use std::time::Instant;

use async_trait::async_trait;
use axum::http::StatusCode;

use super::METRICS_FILTER_ORDER;
use crate::error::GatewayResult;
use crate::filter::{GatewayFilter, GatewayFilterChain};
use crate::http::ServerExchange;
use crate::observability::metrics;

/// Outermost filter: times the rest of the chain and records its outcome.
#[derive(Debug, Default)]
pub struct MetricsFilter;

#[async_trait]
impl GatewayFilter for MetricsFilter {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        let start = Instant::now();
        let method = exchange.request.method.to_string();
        let result = chain.filter(exchange).await;

        let status = match &result {
            Ok(()) => exchange.response.status.unwrap_or(StatusCode::OK),
            Err(e) => e.status().0,
        };
        metrics::record_request(&method, status.as_u16(), exchange.route_id(), start);
        tracing::debug!(
            request_id = exchange.attributes.request_id.as_deref().unwrap_or("unknown"),
            route_id = %exchange.route_id(),
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Filter chain completed"
        );
        result
    }

    fn name(&self) -> &str {
        "Metrics"
    }

    fn order(&self) -> Option<i32> {
        Some(METRICS_FILTER_ORDER)
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use super::LOAD_BALANCER_CLIENT_FILTER_ORDER;
use crate::error::{GatewayError, GatewayResult};
use crate::filter::{GatewayFilter, GatewayFilterChain};
use crate::http::ServerExchange;
use crate::load_balancer::LoadBalancerClient;

pub const LB_SCHEME: &str = "lb";

/// Swaps an `lb://service` request URL for a concrete instance address.
#[derive(Debug)]
pub struct LoadBalancerClientFilter {
    client: Arc<LoadBalancerClient>,
}

impl LoadBalancerClientFilter {
    pub fn new(client: Arc<LoadBalancerClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GatewayFilter for LoadBalancerClientFilter {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        let service = match exchange.attributes.request_url.as_ref() {
            Some(url) if url.scheme() == LB_SCHEME => url.host_str().unwrap_or_default().to_string(),
            _ => return chain.filter(exchange).await,
        };

        let Some(instance) = self.client.choose(&service).await else {
            tracing::warn!(route_id = %exchange.route_id(), service = %service, "No instance available");
            return Err(GatewayError::ServiceUnavailable(service));
        };

        let request = &exchange.request;
        let mut resolved = format!("http://{}{}", instance.addr, request.path());
        if let Some(query) = request.query() {
            resolved.push('?');
            resolved.push_str(query);
        }
        let url = url::Url::parse(&resolved).map_err(|e| GatewayError::Upstream(e.to_string()))?;

        tracing::debug!(service = %service, instance = %instance.addr, "Load balancer chose instance");
        exchange.attributes.request_url = Some(url);
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "LoadBalancerClient"
    }

    fn order(&self) -> Option<i32> {
        Some(LOAD_BALANCER_CLIENT_FILTER_ORDER)
    }
}

//! One route per discovered service.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::{FilterDefinition, PredicateDefinition, RouteDefinition, RouteDefinitionLocator};
use crate::error::GatewayResult;
use crate::load_balancer::DiscoveryClient;

/// For service `users`: id `<prefix>users`, target `lb://users`,
/// `Path=/users/**` and a rewrite stripping the `/users` prefix.
pub struct DiscoveryClientRouteDefinitionLocator {
    client: Arc<dyn DiscoveryClient>,
    route_id_prefix: String,
}

impl DiscoveryClientRouteDefinitionLocator {
    pub fn new(client: Arc<dyn DiscoveryClient>, route_id_prefix: impl Into<String>) -> Self {
        Self {
            client,
            route_id_prefix: route_id_prefix.into(),
        }
    }

    fn definition_for(&self, service: &str) -> Option<RouteDefinition> {
        let uri = match Url::parse(&format!("lb://{}", service)) {
            Ok(uri) if uri.host_str().is_some() => uri,
            _ => {
                tracing::warn!(service = %service, "Service name is not a valid host, no route created");
                return None;
            }
        };

        let definition = RouteDefinition::new(format!("{}{}", self.route_id_prefix, service), uri)
            .predicate(PredicateDefinition::new("Path").with_arg("pattern", format!("/{}/**", service)))
            .filter(
                FilterDefinition::new("RewritePath")
                    .with_arg("regexp", format!("/{}/(?<remaining>.*)", service))
                    .with_arg("replacement", "/${remaining}"),
            );
        Some(definition)
    }
}

#[async_trait]
impl RouteDefinitionLocator for DiscoveryClientRouteDefinitionLocator {
    async fn route_definitions(&self) -> GatewayResult<Vec<RouteDefinition>> {
        Ok(self
            .client
            .services()
            .await
            .iter()
            .filter_map(|service| self.definition_for(service))
            .collect())
    }
}

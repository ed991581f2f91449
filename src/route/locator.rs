//! Sources of route definitions.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures_util::future::join_all;

use super::RouteDefinition;
use crate::config::GatewayProperties;
use crate::error::GatewayResult;

/// Anything that can list route definitions.
#[async_trait]
pub trait RouteDefinitionLocator: Send + Sync {
    async fn route_definitions(&self) -> GatewayResult<Vec<RouteDefinition>>;
}

/// Definitions from the `[gateway]` configuration section.
///
/// Reads the current properties on every call, so a config reload followed
/// by a refresh picks up the new routes.
pub struct PropertiesRouteDefinitionLocator {
    properties: Arc<ArcSwap<GatewayProperties>>,
}

impl PropertiesRouteDefinitionLocator {
    pub fn new(properties: Arc<ArcSwap<GatewayProperties>>) -> Self {
        Self { properties }
    }
}

#[async_trait]
impl RouteDefinitionLocator for PropertiesRouteDefinitionLocator {
    async fn route_definitions(&self) -> GatewayResult<Vec<RouteDefinition>> {
        let properties = self.properties.load();
        let mut definitions = properties.routes.clone();

        for text in &properties.route_shorthands {
            match text.parse::<RouteDefinition>() {
                Ok(definition) => definitions.push(definition),
                Err(e) => tracing::warn!(shorthand = %text, error = %e, "Skipping route shorthand"),
            }
        }

        Ok(definitions)
    }
}

/// Concatenation of several locators, queried concurrently.
pub struct CompositeRouteDefinitionLocator {
    delegates: Vec<Arc<dyn RouteDefinitionLocator>>,
}

impl CompositeRouteDefinitionLocator {
    pub fn new(delegates: Vec<Arc<dyn RouteDefinitionLocator>>) -> Self {
        Self { delegates }
    }
}

#[async_trait]
impl RouteDefinitionLocator for CompositeRouteDefinitionLocator {
    async fn route_definitions(&self) -> GatewayResult<Vec<RouteDefinition>> {
        let results = join_all(self.delegates.iter().map(|d| d.route_definitions())).await;

        let mut definitions = Vec::new();
        for result in results {
            match result {
                Ok(defs) => definitions.extend(defs),
                // one failing source must not hide the routes of the others
                Err(e) => tracing::error!(error = %e, "Route definition source failed"),
            }
        }
        Ok(definitions)
    }
}

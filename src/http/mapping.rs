//! Route selection for an inbound request.

use std::sync::Arc;

use crate::http::ServerExchange;
use crate::route::{CachingRouteLocator, Route};

/// Picks the first route, in snapshot order, whose predicate matches.
pub struct RoutePredicateHandlerMapping {
    routes: Arc<CachingRouteLocator>,
}

impl RoutePredicateHandlerMapping {
    pub fn new(routes: Arc<CachingRouteLocator>) -> Self {
        Self { routes }
    }

    pub fn lookup(&self, exchange: &ServerExchange) -> Option<Arc<Route>> {
        let snapshot = self.routes.snapshot();
        let found = snapshot.iter().find(|route| route.matches(exchange)).cloned();

        match &found {
            Some(route) => tracing::debug!(
                route_id = %route.id(),
                path = %exchange.request.path(),
                "Route matched"
            ),
            None => tracing::debug!(path = %exchange.request.path(), "No route matched"),
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    use crate::route::compiler::test_support::compiler;
    use crate::route::{InMemoryRouteDefinitionRepository, RouteDefinitionRepository, RouteLocator};
    use crate::config::GatewayProperties;

    #[tokio::test]
    async fn first_match_in_order_wins() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        for text in [
            "catch_all=http://localhost:9000,Path=/**",
            "specific=http://localhost:9001,Path=/api/**",
        ] {
            let mut def: crate::route::RouteDefinition = text.parse().unwrap();
            if def.id == "specific" {
                def.order = -1;
            }
            repo.save(def).await.unwrap();
        }

        let compiler: Arc<dyn RouteLocator> = Arc::new(compiler(repo, GatewayProperties::default()));
        let mapping = RoutePredicateHandlerMapping::new(Arc::new(CachingRouteLocator::new(compiler).await));

        let ex = ServerExchange::from_parts(Method::GET, "/api/users").unwrap();
        assert_eq!(mapping.lookup(&ex).unwrap().id(), "specific");

        let ex = ServerExchange::from_parts(Method::GET, "/other").unwrap();
        assert_eq!(mapping.lookup(&ex).unwrap().id(), "catch_all");
    }

    #[tokio::test]
    async fn no_routes_no_match() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        let compiler: Arc<dyn RouteLocator> = Arc::new(compiler(repo, GatewayProperties::default()));
        let mapping = RoutePredicateHandlerMapping::new(Arc::new(CachingRouteLocator::new(compiler).await));

        let ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        assert!(mapping.lookup(&ex).is_none());
    }
}

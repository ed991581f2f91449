//! Route compilation: definitions to executable routes.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use super::{FilterDefinition, PredicateDefinition, Route, RouteDefinition, RouteDefinitionLocator};
use crate::config::GatewayProperties;
use crate::error::{GatewayError, GatewayResult};
use crate::factory::{ArgumentResolver, FactoryRegistry};
use crate::filter::factory::GatewayFilterFactory;
use crate::filter::OrderedFilter;
use crate::observability::metrics;
use crate::predicate::{and, RoutePredicateFactory, SharedPredicate};

/// Source of compiled routes.
#[async_trait]
pub trait RouteLocator: Send + Sync {
    async fn routes(&self) -> GatewayResult<Vec<Arc<Route>>>;
}

/// Compiles every definition from a locator, dropping the ones that fail.
pub struct RouteDefinitionRouteLocator {
    definitions: Arc<dyn RouteDefinitionLocator>,
    predicates: Arc<FactoryRegistry<dyn RoutePredicateFactory>>,
    filters: Arc<FactoryRegistry<dyn GatewayFilterFactory>>,
    resolver: ArgumentResolver,
    properties: Arc<ArcSwap<GatewayProperties>>,
}

impl RouteDefinitionRouteLocator {
    pub fn new(
        definitions: Arc<dyn RouteDefinitionLocator>,
        predicates: Arc<FactoryRegistry<dyn RoutePredicateFactory>>,
        filters: Arc<FactoryRegistry<dyn GatewayFilterFactory>>,
        resolver: ArgumentResolver,
        properties: Arc<ArcSwap<GatewayProperties>>,
    ) -> Self {
        Self {
            definitions,
            predicates,
            filters,
            resolver,
            properties,
        }
    }

    pub fn predicate_factories(&self) -> &FactoryRegistry<dyn RoutePredicateFactory> {
        &self.predicates
    }

    pub fn filter_factories(&self) -> &FactoryRegistry<dyn GatewayFilterFactory> {
        &self.filters
    }

    /// Compile one definition against the current default filters.
    pub fn compile(&self, definition: &RouteDefinition) -> GatewayResult<Route> {
        if definition.predicates.is_empty() {
            return Err(GatewayError::InvalidRoute {
                id: definition.id.clone(),
                reason: "at least one predicate is required".to_string(),
            });
        }

        let mut predicate = self.predicate(&definition.id, &definition.predicates[0])?;
        for def in &definition.predicates[1..] {
            predicate = and(predicate, self.predicate(&definition.id, def)?);
        }

        let mut filters = if definition.skip_default_filters {
            Vec::new()
        } else {
            self.load_filters(&definition.id, &self.properties.load().default_filters)?
        };
        filters.extend(self.load_filters(&definition.id, &definition.filters)?);

        Ok(Route::new(
            definition.id.clone(),
            definition.uri.clone(),
            definition.order,
            predicate,
            filters,
        ))
    }

    fn predicate(&self, route_id: &str, def: &PredicateDefinition) -> GatewayResult<SharedPredicate> {
        let factory = self
            .predicates
            .lookup(&def.name)
            .ok_or_else(|| GatewayError::UnknownPredicateFactory(def.name.clone()))?;
        let bundle = self.resolver.resolve(factory.as_ref(), &def.args)?;
        tracing::debug!(route_id = %route_id, predicate = %def.name, args = ?bundle, "Applying predicate");
        factory.apply(&bundle)
    }

    /// Filters without their own order get `index + 1` within this group.
    fn load_filters(&self, route_id: &str, defs: &[FilterDefinition]) -> GatewayResult<Vec<OrderedFilter>> {
        defs.iter()
            .enumerate()
            .map(|(i, def)| {
                let factory = self
                    .filters
                    .lookup(&def.name)
                    .ok_or_else(|| GatewayError::UnknownFilterFactory(def.name.clone()))?;
                let bundle = self.resolver.resolve(factory.as_ref(), &def.args)?;
                tracing::debug!(route_id = %route_id, filter = %def.name, args = ?bundle, "Applying filter");
                let filter = factory.apply(&bundle)?;
                Ok(OrderedFilter::with_default_order(filter, i as i32 + 1))
            })
            .collect()
    }
}

#[async_trait]
impl RouteLocator for RouteDefinitionRouteLocator {
    async fn routes(&self) -> GatewayResult<Vec<Arc<Route>>> {
        let definitions = self.definitions.route_definitions().await?;
        let mut routes = Vec::with_capacity(definitions.len());

        for definition in &definitions {
            match self.compile(definition) {
                Ok(route) => {
                    tracing::debug!(route_id = %definition.id, "Route definition applied");
                    routes.push(Arc::new(route));
                }
                Err(e) => {
                    tracing::warn!(route_id = %definition.id, error = %e, "Dropping route that failed to compile");
                    metrics::record_route_compile_failure(&definition.id);
                }
            }
        }
        Ok(routes)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::RateLimiterConfig;
    use crate::factory::ComponentRegistry;
    use crate::filter::factory::builtin_factories as builtin_filters;
    use crate::predicate::builtin_factories as builtin_predicates;
    use crate::ratelimit::TokenBucketRateLimiter;

    /// A compiler over the built-in factories with the given properties.
    pub fn compiler(
        definitions: Arc<dyn RouteDefinitionLocator>,
        properties: GatewayProperties,
    ) -> RouteDefinitionRouteLocator {
        let limiter = Arc::new(TokenBucketRateLimiter::new());
        let components = ComponentRegistry::with_defaults(&RateLimiterConfig::default(), limiter.clone());
        RouteDefinitionRouteLocator::new(
            definitions,
            Arc::new(builtin_predicates()),
            Arc::new(builtin_filters(limiter)),
            ArgumentResolver::new(Arc::new(components)),
            Arc::new(ArcSwap::from_pointee(properties)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::compiler;
    use super::*;
    use axum::http::Method;

    use crate::http::ServerExchange;
    use crate::route::InMemoryRouteDefinitionRepository;
    use crate::route::RouteDefinitionRepository;

    fn no_defaults() -> GatewayProperties {
        GatewayProperties {
            default_filters: Vec::new(),
            ..Default::default()
        }
    }

    fn definition(text: &str) -> RouteDefinition {
        text.parse().unwrap()
    }

    fn exchange(method: Method, uri: &str) -> ServerExchange {
        ServerExchange::from_parts(method, uri).unwrap()
    }

    #[test]
    fn predicates_are_and_combined() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        let compiler = compiler(repo, no_defaults());
        let route = compiler
            .compile(&definition("r1=http://localhost:9000,Path=/get,Method=GET"))
            .unwrap();

        assert!(route.matches(&exchange(Method::GET, "/get")));
        assert!(!route.matches(&exchange(Method::POST, "/get")));
        assert!(!route.matches(&exchange(Method::GET, "/other")));
    }

    #[test]
    fn named_path_argument_compiles_through_registry() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        let compiler = compiler(repo, no_defaults());
        let def = RouteDefinition::new("r1", "http://httpbin.org:80".parse().unwrap())
            .predicate(PredicateDefinition::new("Path").with_arg("pattern", "/get"));

        let route = compiler.compile(&def).unwrap();
        assert_eq!(route.id(), "r1");
        assert_eq!(route.uri().as_str(), "http://httpbin.org/");
        assert!(route.matches(&exchange(Method::GET, "/get")));
        assert!(!route.matches(&exchange(Method::GET, "/post")));
    }

    #[test]
    fn route_can_skip_default_filters() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        let compiler = compiler(repo, GatewayProperties::default());

        let with_defaults = compiler.compile(&definition("a=http://localhost:9000,Path=/a")).unwrap();
        assert_eq!(with_defaults.filters()[0].name(), "RemoveNonProxyHeaders");

        let mut def = definition("b=http://localhost:9000,Path=/b").without_default_filters();
        def.filters = vec!["PrefixPath=/api".parse().unwrap()];
        let names: Vec<_> = compiler
            .compile(&def)
            .unwrap()
            .filters()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["PrefixPath"]);
    }

    #[test]
    fn filter_orders_restart_per_group() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        let mut props = no_defaults();
        props.default_filters = vec!["AddRequestHeader=X-Default, 1".parse().unwrap()];
        let compiler = compiler(repo, props);

        let mut def = definition("r1=http://localhost:9000,Path=/**");
        def.filters = vec![
            "AddResponseHeader=X-A, a".parse().unwrap(),
            "PrefixPath=/api".parse().unwrap(),
        ];
        let route = compiler.compile(&def).unwrap();

        let orders: Vec<_> = route.filters().iter().map(|f| (f.name().to_string(), f.order)).collect();
        assert_eq!(
            orders,
            vec![
                ("AddRequestHeader".to_string(), 1),
                ("AddResponseHeader".to_string(), 1),
                ("PrefixPath".to_string(), 2),
            ]
        );
    }

    #[test]
    fn unknown_factories_and_bad_args_fail() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        let compiler = compiler(repo, no_defaults());

        let err = compiler
            .compile(&definition("r1=http://localhost:9000,Nope=1"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownPredicateFactory(n) if n == "Nope"));

        let mut def = definition("r1=http://localhost:9000,Path=/x");
        def.filters = vec!["Nope=1".parse().unwrap()];
        assert!(matches!(
            compiler.compile(&def).unwrap_err(),
            GatewayError::UnknownFilterFactory(_)
        ));

        let err = compiler
            .compile(&definition("r1=http://localhost:9000,Header=X-Only"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::ArgumentCountMismatch { found: 1, .. }));
    }

    #[tokio::test]
    async fn broken_routes_are_dropped_not_fatal() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        repo.save(definition("good=http://localhost:9000,Path=/good")).await.unwrap();
        repo.save(definition("bad=http://localhost:9000,Unknown=1")).await.unwrap();

        let compiler = compiler(repo, no_defaults());
        let routes = compiler.routes().await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].id(), "good");
    }

    #[test]
    fn expression_arguments_reach_factories() {
        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        let compiler = compiler(repo, no_defaults());
        let mut def = definition("limited=http://localhost:9000,Path=/**");
        def.filters = vec!["RequestRateLimiter=#{@defaultReplenishRate}, #{@defaultBurstCapacity * 2}, #{@remoteAddrKeyResolver}"
            .parse()
            .unwrap()];

        let route = compiler.compile(&def).unwrap();
        assert_eq!(route.filters()[0].name(), "RequestRateLimiter");
    }
}

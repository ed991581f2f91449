//! Path and Host predicates.

use std::sync::Arc;

use super::{RoutePredicate, RoutePredicateFactory, SharedPredicate};
use crate::error::GatewayResult;
use crate::factory::{ArgumentBundle, ArgumentHints, Factory};
use crate::http::ServerExchange;
use crate::predicate::pattern::AntPattern;

const PATTERN_KEY: &str = "pattern";

#[derive(Debug)]
struct PathPredicate {
    pattern: AntPattern,
}

impl RoutePredicate for PathPredicate {
    fn test(&self, exchange: &ServerExchange) -> bool {
        self.pattern.matches(exchange.request.path())
    }
}

/// `Path=/api/**`
#[derive(Debug, Default)]
pub struct PathRoutePredicateFactory;

impl ArgumentHints for PathRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[PATTERN_KEY]
    }
}

impl Factory for PathRoutePredicateFactory {
    fn name(&self) -> &str {
        "Path"
    }
}

impl RoutePredicateFactory for PathRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        let pattern = AntPattern::path(&args.string(PATTERN_KEY)?);
        Ok(Arc::new(PathPredicate { pattern }))
    }
}

#[derive(Debug)]
struct HostPredicate {
    pattern: AntPattern,
}

impl RoutePredicate for HostPredicate {
    fn test(&self, exchange: &ServerExchange) -> bool {
        exchange
            .request
            .host()
            .is_some_and(|host| self.pattern.matches(host))
    }
}

/// `Host=**.example.org`
#[derive(Debug, Default)]
pub struct HostRoutePredicateFactory;

impl ArgumentHints for HostRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[PATTERN_KEY]
    }
}

impl Factory for HostRoutePredicateFactory {
    fn name(&self) -> &str {
        "Host"
    }
}

impl RoutePredicateFactory for HostRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        let pattern = AntPattern::host(&args.string(PATTERN_KEY)?);
        Ok(Arc::new(HostPredicate { pattern }))
    }
}

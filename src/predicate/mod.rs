//! Route predicates.
//!
//! # Data Flow
//! ```text
//! PredicateDefinition
//!     → RoutePredicateFactory::apply(bundle)
//!         - path.rs (Path, Host)
//!         - request.rs (Method, Header, Query, Cookie)
//!         - datetime.rs (After, Before, Between)
//!         - remote_addr.rs (RemoteAddr)
//!     → and() chain across all predicates of a route
//!     → RoutePredicate::test(&exchange) during handler mapping
//! ```
//!
//! # Design Decisions
//! - Predicates are pure and synchronous; they never mutate the exchange
//! - Composition short-circuits left to right in declaration order
//! - Patterns and regexes are compiled once when the route is compiled

pub mod datetime;
pub mod path;
pub mod pattern;
pub mod remote_addr;
pub mod request;

use std::fmt;
use std::sync::Arc;

use crate::error::GatewayResult;
use crate::factory::{ArgumentBundle, Factory, FactoryRegistry};
use crate::http::ServerExchange;

/// A boolean test over a request.
pub trait RoutePredicate: Send + Sync + fmt::Debug {
    fn test(&self, exchange: &ServerExchange) -> bool;
}

pub type SharedPredicate = Arc<dyn RoutePredicate>;

/// Builds predicates from resolved arguments.
pub trait RoutePredicateFactory: Factory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate>;
}

/// Logical AND of two predicates, evaluated left first.
#[derive(Debug)]
pub struct AndPredicate {
    left: SharedPredicate,
    right: SharedPredicate,
}

impl RoutePredicate for AndPredicate {
    fn test(&self, exchange: &ServerExchange) -> bool {
        self.left.test(exchange) && self.right.test(exchange)
    }
}

pub fn and(left: SharedPredicate, right: SharedPredicate) -> SharedPredicate {
    Arc::new(AndPredicate { left, right })
}

/// Predicate backed by a closure, labelled for diagnostics.
pub struct FnPredicate<F> {
    label: String,
    test: F,
}

impl<F> fmt::Debug for FnPredicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl<F> RoutePredicate for FnPredicate<F>
where
    F: Fn(&ServerExchange) -> bool + Send + Sync,
{
    fn test(&self, exchange: &ServerExchange) -> bool {
        (self.test)(exchange)
    }
}

pub fn predicate_fn<F>(label: impl Into<String>, test: F) -> SharedPredicate
where
    F: Fn(&ServerExchange) -> bool + Send + Sync + 'static,
{
    Arc::new(FnPredicate {
        label: label.into(),
        test,
    })
}

/// Registry holding every built-in predicate factory.
pub fn builtin_factories() -> FactoryRegistry<dyn RoutePredicateFactory> {
    let mut registry: FactoryRegistry<dyn RoutePredicateFactory> = FactoryRegistry::new("predicate");
    registry.register_factory(Arc::new(datetime::AfterRoutePredicateFactory));
    registry.register_factory(Arc::new(datetime::BeforeRoutePredicateFactory));
    registry.register_factory(Arc::new(datetime::BetweenRoutePredicateFactory));
    registry.register_factory(Arc::new(request::CookieRoutePredicateFactory));
    registry.register_factory(Arc::new(request::HeaderRoutePredicateFactory));
    registry.register_factory(Arc::new(path::HostRoutePredicateFactory));
    registry.register_factory(Arc::new(request::MethodRoutePredicateFactory));
    registry.register_factory(Arc::new(path::PathRoutePredicateFactory));
    registry.register_factory(Arc::new(request::QueryRoutePredicateFactory));
    registry.register_factory(Arc::new(remote_addr::RemoteAddrRoutePredicateFactory));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::Method;

    #[test]
    fn and_short_circuits_left_to_right() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let right = predicate_fn("counted", move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            true
        });

        let ex = ServerExchange::from_parts(Method::GET, "/").unwrap();

        let never = and(predicate_fn("never", |_| false), right.clone());
        assert!(!never.test(&ex));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let always = and(predicate_fn("always", |_| true), right);
        assert!(always.test(&ex));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(format!("{:?}", never), "AndPredicate { left: never, right: counted }");
    }

    #[test]
    fn builtins_are_registered_by_name() {
        let registry = builtin_factories();
        for name in ["After", "Before", "Between", "Cookie", "Header", "Host", "Method", "Path", "Query", "RemoteAddr"] {
            assert!(registry.lookup(name).is_some(), "missing {}", name);
        }
    }
}

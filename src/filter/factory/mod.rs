//! Built-in route filter factories.
//!
//! - headers.rs: request/response header manipulation, SecureHeaders
//! - path.rs: PrefixPath, SetPath, RewritePath, AddRequestParameter
//! - status.rs: SetStatus, RedirectTo
//! - rate_limit.rs: RequestRateLimiter

pub mod headers;
pub mod path;
pub mod rate_limit;
pub mod status;

use std::sync::Arc;

use super::GatewayFilter;
use headers::{HeaderGatewayFilterFactory, HeaderOp};
use crate::error::GatewayResult;
use crate::factory::{ArgumentBundle, Factory, FactoryRegistry};
use crate::ratelimit::RateLimiter;

pub type SharedFilter = Arc<dyn GatewayFilter>;

/// Builds route filters from resolved arguments.
pub trait GatewayFilterFactory: Factory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter>;
}

/// Registry holding every built-in filter factory.
///
/// `rate_limiter` backs `RequestRateLimiter` routes that do not name one.
pub fn builtin_factories(rate_limiter: Arc<dyn RateLimiter>) -> FactoryRegistry<dyn GatewayFilterFactory> {
    let mut registry: FactoryRegistry<dyn GatewayFilterFactory> = FactoryRegistry::new("filter");
    registry.register_factory(Arc::new(HeaderGatewayFilterFactory::new(HeaderOp::AddRequest)));
    registry.register_factory(Arc::new(path::AddRequestParameterGatewayFilterFactory));
    registry.register_factory(Arc::new(HeaderGatewayFilterFactory::new(HeaderOp::AddResponse)));
    registry.register_factory(Arc::new(path::PrefixPathGatewayFilterFactory));
    registry.register_factory(Arc::new(status::RedirectToGatewayFilterFactory));
    registry.register_factory(Arc::new(headers::RemoveNonProxyHeadersGatewayFilterFactory));
    registry.register_factory(Arc::new(HeaderGatewayFilterFactory::new(HeaderOp::RemoveRequest)));
    registry.register_factory(Arc::new(HeaderGatewayFilterFactory::new(HeaderOp::RemoveResponse)));
    registry.register_factory(Arc::new(rate_limit::RequestRateLimiterGatewayFilterFactory::new(
        rate_limiter,
    )));
    registry.register_factory(Arc::new(path::RewritePathGatewayFilterFactory));
    registry.register_factory(Arc::new(headers::SecureHeadersGatewayFilterFactory));
    registry.register_factory(Arc::new(path::SetPathGatewayFilterFactory));
    registry.register_factory(Arc::new(HeaderGatewayFilterFactory::new(HeaderOp::SetResponse)));
    registry.register_factory(Arc::new(status::SetStatusGatewayFilterFactory));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered_by_name() {
        let registry = builtin_factories(Arc::new(crate::ratelimit::TokenBucketRateLimiter::new()));
        for name in [
            "AddRequestHeader",
            "AddRequestParameter",
            "AddResponseHeader",
            "PrefixPath",
            "RedirectTo",
            "RemoveNonProxyHeaders",
            "RemoveRequestHeader",
            "RemoveResponseHeader",
            "RequestRateLimiter",
            "RewritePath",
            "SecureHeaders",
            "SetPath",
            "SetResponseHeader",
            "SetStatus",
        ] {
            assert!(registry.lookup(name).is_some(), "missing {}", name);
        }
        assert_eq!(registry.len(), 14);
    }
}

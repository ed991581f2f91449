//! Named shared components referenced from expressions as `@name`.

use std::collections::HashMap;
use std::sync::Arc;

use super::ArgValue;
use crate::config::RateLimiterConfig;
use crate::ratelimit::{
    KeyResolver, PrincipalNameKeyResolver, RateLimiter, RemoteAddrKeyResolver,
    TokenBucketRateLimiter,
};

pub const PRINCIPAL_NAME_KEY_RESOLVER: &str = "principalNameKeyResolver";
pub const REMOTE_ADDR_KEY_RESOLVER: &str = "remoteAddrKeyResolver";
pub const TOKEN_BUCKET_RATE_LIMITER: &str = "tokenBucketRateLimiter";

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, ArgValue>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in components plus limiter defaults from configuration.
    ///
    /// The same limiter instance is handed out so buckets are shared between
    /// routes that reference it.
    pub fn with_defaults(config: &RateLimiterConfig, limiter: Arc<TokenBucketRateLimiter>) -> Self {
        let mut registry = Self::new();

        let principal: Arc<dyn KeyResolver> = Arc::new(PrincipalNameKeyResolver);
        let remote: Arc<dyn KeyResolver> = Arc::new(RemoteAddrKeyResolver);
        let limiter: Arc<dyn RateLimiter> = limiter;

        registry.register(PRINCIPAL_NAME_KEY_RESOLVER, principal);
        registry.register(REMOTE_ADDR_KEY_RESOLVER, remote);
        registry.register(TOKEN_BUCKET_RATE_LIMITER, limiter);
        registry.register("defaultReplenishRate", i64::from(config.default_replenish_rate));
        registry.register("defaultBurstCapacity", i64::from(config.default_burst_capacity));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) {
        let name = name.into();
        if self.components.insert(name.clone(), value.into()).is_some() {
            tracing::warn!(component = %name, "Component replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.components.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }
}

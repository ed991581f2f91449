//! Request rate limiting.
//!
//! # Data Flow
//! ```text
//! RequestRateLimiter filter
//!     → key_resolver.rs (principal name, remote address, ...)
//!     → RateLimiter::is_allowed(route-scoped key, config)
//!         → token_bucket.rs (refill by elapsed time, take one token)
//!     → allowed: continue chain | denied: 429
//! ```
//!
//! # Design Decisions
//! - Limiters and key resolvers are trait objects registered as named
//!   components, so routes can pick them from expressions
//! - Bucket state is per key and updated atomically per key
//! - A denial is a normal response, never an error

pub mod key_resolver;
pub mod token_bucket;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GatewayError, GatewayResult};

pub use key_resolver::{KeyResolver, PrincipalNameKeyResolver, RemoteAddrKeyResolver};
pub use token_bucket::TokenBucketRateLimiter;

/// Per-route limiter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Tokens added per second.
    pub replenish_rate: f64,
    /// Maximum tokens a bucket holds.
    pub burst_capacity: f64,
}

impl RateLimitConfig {
    pub fn new(replenish_rate: f64, burst_capacity: f64) -> GatewayResult<Self> {
        if !(replenish_rate.is_finite() && replenish_rate > 0.0) {
            return Err(GatewayError::invalid_argument(
                "replenishRate",
                "must be a positive number",
            ));
        }
        if !(burst_capacity.is_finite() && burst_capacity >= 1.0) {
            return Err(GatewayError::invalid_argument(
                "burstCapacity",
                "must be at least 1",
            ));
        }
        Ok(Self {
            replenish_rate,
            burst_capacity,
        })
    }
}

/// Outcome of one limiter check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitResponse {
    pub allowed: bool,
    /// Whole tokens left after this request.
    pub tokens_remaining: u64,
    /// Time until a token becomes available; zero when allowed.
    pub retry_after: Duration,
}

#[async_trait]
pub trait RateLimiter: Send + Sync + fmt::Debug {
    async fn is_allowed(&self, key: &str, config: &RateLimitConfig) -> GatewayResult<RateLimitResponse>;
}

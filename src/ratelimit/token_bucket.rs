//! In-memory token bucket limiter.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{RateLimitConfig, RateLimitResponse, RateLimiter};
use crate::error::GatewayResult;

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    /// Config of the most recent check, used when sweeping.
    config: RateLimitConfig,
}

impl TokenBucket {
    fn new(config: RateLimitConfig, now: Instant) -> Self {
        Self {
            tokens: config.burst_capacity,
            last_update: now,
            config,
        }
    }

    fn refill(&self, config: &RateLimitConfig, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        (self.tokens + elapsed * config.replenish_rate).min(config.burst_capacity)
    }

    fn is_full(&self, now: Instant) -> bool {
        self.refill(&self.config, now) >= self.config.burst_capacity
    }

    fn try_acquire(&mut self, config: &RateLimitConfig, now: Instant) -> RateLimitResponse {
        let tokens = self.refill(config, now);
        self.last_update = now;
        self.config = *config;

        if tokens >= 1.0 {
            self.tokens = tokens - 1.0;
            RateLimitResponse {
                allowed: true,
                tokens_remaining: self.tokens.floor() as u64,
                retry_after: Duration::ZERO,
            }
        } else {
            // keep the refilled level so the next request sees accumulated time
            self.tokens = tokens;
            RateLimitResponse {
                allowed: false,
                tokens_remaining: 0,
                // tiny rates put the next token beyond what a Duration can hold
                retry_after: Duration::try_from_secs_f64((1.0 - tokens) / config.replenish_rate)
                    .unwrap_or(Duration::MAX),
            }
        }
    }
}

/// Token buckets keyed by caller, held in process memory.
#[derive(Debug, Default)]
pub struct TokenBucketRateLimiter {
    buckets: DashMap<String, TokenBucket>,
}

impl TokenBucketRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and consume at an explicit instant.
    pub fn check_at(&self, key: &str, config: &RateLimitConfig, now: Instant) -> RateLimitResponse {
        // the entry guard holds the shard lock for the whole read-modify-write
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(*config, now));
        bucket.try_acquire(config, now)
    }

    /// Drop buckets that have refilled completely. A full bucket behaves
    /// exactly like a fresh one, so this loses no state.
    pub fn evict_full(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_full(now));
        before - self.buckets.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

#[async_trait]
impl RateLimiter for TokenBucketRateLimiter {
    async fn is_allowed(&self, key: &str, config: &RateLimitConfig) -> GatewayResult<RateLimitResponse> {
        Ok(self.check_at(key, config, Instant::now()))
    }
}

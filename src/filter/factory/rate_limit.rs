//! Request rate limiting filter.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderValue, StatusCode};

use super::{GatewayFilterFactory, SharedFilter};
use crate::error::GatewayResult;
use crate::factory::{ArgumentBundle, ArgumentHints, Factory};
use crate::filter::{GatewayFilter, GatewayFilterChain};
use crate::http::ServerExchange;
use crate::observability::metrics;
use crate::ratelimit::{KeyResolver, PrincipalNameKeyResolver, RateLimitConfig, RateLimiter};

const REPLENISH_RATE_KEY: &str = "replenishRate";
const BURST_CAPACITY_KEY: &str = "burstCapacity";
const KEY_RESOLVER_KEY: &str = "keyResolver";
const RATE_LIMITER_KEY: &str = "rateLimiter";

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const REPLENISH_RATE_HEADER: &str = "x-ratelimit-replenish-rate";
pub const BURST_CAPACITY_HEADER: &str = "x-ratelimit-burst-capacity";

#[derive(Debug)]
struct RequestRateLimiter {
    config: RateLimitConfig,
    key_resolver: Arc<dyn KeyResolver>,
    limiter: Arc<dyn RateLimiter>,
}

#[async_trait]
impl GatewayFilter for RequestRateLimiter {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        let Some(key) = self.key_resolver.resolve(exchange).await else {
            tracing::debug!(route_id = %exchange.route_id(), "No rate limit key, rejecting");
            exchange.response.status = Some(StatusCode::FORBIDDEN);
            exchange.response.set_complete();
            return Ok(());
        };

        // buckets are per route so one route's traffic never drains another's
        let scoped_key = format!("{}.{}", exchange.route_id(), key);
        let outcome = self.limiter.is_allowed(&scoped_key, &self.config).await?;

        let headers = &mut exchange.response.headers;
        headers.insert(REMAINING_HEADER, HeaderValue::from(outcome.tokens_remaining));
        headers.insert(
            REPLENISH_RATE_HEADER,
            HeaderValue::from(self.config.replenish_rate.ceil() as u64),
        );
        headers.insert(
            BURST_CAPACITY_HEADER,
            HeaderValue::from(self.config.burst_capacity.floor() as u64),
        );

        if outcome.allowed {
            return chain.filter(exchange).await;
        }

        let route_id = exchange.route_id().to_string();
        tracing::warn!(route_id = %route_id, key = %key, "Rate limit exceeded");
        metrics::record_rate_limited(&route_id);

        let retry_secs = outcome.retry_after.as_secs_f64().ceil().max(1.0) as u64;
        exchange
            .response
            .headers
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
        exchange.response.status = Some(StatusCode::TOO_MANY_REQUESTS);
        exchange.response.set_complete();
        Ok(())
    }

    fn name(&self) -> &str {
        "RequestRateLimiter"
    }
}

/// `RequestRateLimiter=10, 20, #{@remoteAddrKeyResolver}`
///
/// The key resolver defaults to the principal name; the limiter defaults to
/// the shared token bucket limiter.
#[derive(Debug)]
pub struct RequestRateLimiterGatewayFilterFactory {
    default_limiter: Arc<dyn RateLimiter>,
}

impl RequestRateLimiterGatewayFilterFactory {
    pub fn new(default_limiter: Arc<dyn RateLimiter>) -> Self {
        Self { default_limiter }
    }
}

impl ArgumentHints for RequestRateLimiterGatewayFilterFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[REPLENISH_RATE_KEY, BURST_CAPACITY_KEY, KEY_RESOLVER_KEY, RATE_LIMITER_KEY]
    }

    fn validate_args(&self) -> bool {
        false
    }
}

impl Factory for RequestRateLimiterGatewayFilterFactory {
    fn name(&self) -> &str {
        "RequestRateLimiter"
    }
}

impl GatewayFilterFactory for RequestRateLimiterGatewayFilterFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        args.validate_min(2, self.name())?;

        let config = RateLimitConfig::new(args.f64(REPLENISH_RATE_KEY)?, args.f64(BURST_CAPACITY_KEY)?)?;
        let key_resolver = args
            .key_resolver(KEY_RESOLVER_KEY)?
            .unwrap_or_else(|| Arc::new(PrincipalNameKeyResolver));
        let limiter = args
            .rate_limiter(RATE_LIMITER_KEY)?
            .unwrap_or_else(|| self.default_limiter.clone());

        Ok(Arc::new(RequestRateLimiter {
            config,
            key_resolver,
            limiter,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::ArgValue;
    use crate::filter::test_support::recording;
    use crate::filter::OrderedFilter;
    use crate::ratelimit::{RemoteAddrKeyResolver, TokenBucketRateLimiter};
    use axum::http::Method;
    use std::sync::Mutex;

    fn factory() -> RequestRateLimiterGatewayFilterFactory {
        RequestRateLimiterGatewayFilterFactory::new(Arc::new(TokenBucketRateLimiter::new()))
    }

    fn remote_addr_args(rate: i64, burst: i64) -> ArgumentBundle {
        let resolver: Arc<dyn KeyResolver> = Arc::new(RemoteAddrKeyResolver);
        [
            (REPLENISH_RATE_KEY, ArgValue::Int(rate)),
            (BURST_CAPACITY_KEY, ArgValue::Int(burst)),
            (KEY_RESOLVER_KEY, ArgValue::KeyResolver(resolver)),
        ]
        .into_iter()
        .collect()
    }

    fn exchange_from(addr: Option<&str>) -> ServerExchange {
        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        ex.request.remote_addr = addr.map(|a| a.parse().unwrap());
        ex
    }

    #[tokio::test]
    async fn denies_after_burst_with_429() {
        let filter = factory().apply(&remote_addr_args(1, 2)).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let filters = vec![OrderedFilter::new(filter, 1), OrderedFilter::new(recording("next", &log), 2)];

        for expected_remaining in ["1", "0"] {
            let mut ex = exchange_from(Some("10.0.0.1:1000"));
            GatewayFilterChain::new(&filters).filter(&mut ex).await.unwrap();
            assert!(!ex.response.is_committed());
            assert_eq!(ex.response.headers[REMAINING_HEADER], expected_remaining);
            assert_eq!(ex.response.headers[BURST_CAPACITY_HEADER], "2");
        }

        let mut ex = exchange_from(Some("10.0.0.1:1000"));
        GatewayFilterChain::new(&filters).filter(&mut ex).await.unwrap();
        assert!(ex.response.is_committed());
        assert_eq!(ex.response.status, Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(ex.response.headers[header::RETRY_AFTER], "1");
        // only the two allowed requests reached the rest of the chain
        assert_eq!(log.lock().unwrap().iter().filter(|l| l.starts_with("pre")).count(), 2);

        // other clients keep their own bucket
        let mut ex = exchange_from(Some("10.0.0.2:1000"));
        GatewayFilterChain::new(&filters).filter(&mut ex).await.unwrap();
        assert!(!ex.response.is_committed());
    }

    #[tokio::test]
    async fn unresolvable_key_is_forbidden() {
        let filter = factory().apply(&remote_addr_args(1, 1)).unwrap();
        let filters = vec![OrderedFilter::new(filter, 1)];
        let mut ex = exchange_from(None);
        GatewayFilterChain::new(&filters).filter(&mut ex).await.unwrap();
        assert_eq!(ex.response.status, Some(StatusCode::FORBIDDEN));
        assert!(ex.response.is_committed());
    }

    #[test]
    fn requires_rate_and_burst() {
        let one: ArgumentBundle = [(REPLENISH_RATE_KEY, "1")].into_iter().collect();
        assert!(factory().apply(&one).is_err());

        let wrong_type: ArgumentBundle = [
            (REPLENISH_RATE_KEY, ArgValue::Int(1)),
            (BURST_CAPACITY_KEY, ArgValue::Int(1)),
            (KEY_RESOLVER_KEY, ArgValue::from("principal")),
        ]
        .into_iter()
        .collect();
        assert!(factory().apply(&wrong_type).is_err());
    }
}

//! Gateway filters and the chain executor.
//!
//! # Data Flow
//! ```text
//! matched Route
//!     → handler.rs (global filters ++ route filters, stable sort by order)
//!     → GatewayFilterChain::filter(exchange)
//!         → filter[0].filter(exchange, chain.next())
//!             → ... pre work, then chain.filter(exchange).await, then post work
//!         → past the last filter: done
//! ```
//!
//! # Design Decisions
//! - The chain is a cursor over a borrowed slice; advancing consumes it, so
//!   each filter can continue the chain at most once
//! - A filter that returns without calling the chain short-circuits the rest
//! - Filters without an explicit order get one from their declaration position

pub mod factory;
pub mod global;
pub mod handler;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::http::ServerExchange;

pub use handler::FilteringWebHandler;

/// A unit of request/response processing.
#[async_trait]
pub trait GatewayFilter: Send + Sync + fmt::Debug {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()>;

    /// Label used in logs and the admin API.
    fn name(&self) -> &str;

    /// Explicit position; `None` lets the route compiler assign one.
    fn order(&self) -> Option<i32> {
        None
    }
}

/// A filter together with its effective order.
#[derive(Clone)]
pub struct OrderedFilter {
    pub filter: Arc<dyn GatewayFilter>,
    pub order: i32,
}

impl OrderedFilter {
    pub fn new(filter: Arc<dyn GatewayFilter>, order: i32) -> Self {
        Self { filter, order }
    }

    /// Use the filter's own order, falling back to `default`.
    pub fn with_default_order(filter: Arc<dyn GatewayFilter>, default: i32) -> Self {
        let order = filter.order().unwrap_or(default);
        Self { filter, order }
    }

    pub fn name(&self) -> &str {
        self.filter.name()
    }
}

impl fmt::Debug for OrderedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, order = {}]", self.filter, self.order)
    }
}

/// Stable sort by order; equal orders keep their relative position.
pub fn sort_filters(filters: &mut [OrderedFilter]) {
    filters.sort_by_key(|f| f.order);
}

/// Cursor over the remaining filters of one request.
pub struct GatewayFilterChain<'a> {
    filters: &'a [OrderedFilter],
    index: usize,
}

impl<'a> GatewayFilterChain<'a> {
    pub fn new(filters: &'a [OrderedFilter]) -> Self {
        Self { filters, index: 0 }
    }

    /// Run the filter at the cursor, handing it the advanced chain.
    pub async fn filter(self, exchange: &mut ServerExchange) -> GatewayResult<()> {
        match self.filters.get(self.index) {
            Some(current) => {
                let next = Self {
                    filters: self.filters,
                    index: self.index + 1,
                };
                current.filter.filter(exchange, next).await
            }
            None => Ok(()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.filters.len().saturating_sub(self.index)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records its name into a shared log before and after continuing.
    #[derive(Debug)]
    pub struct Recording {
        pub label: &'static str,
        pub log: Arc<Mutex<Vec<String>>>,
        pub short_circuit: bool,
    }

    #[async_trait]
    impl GatewayFilter for Recording {
        async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
            self.log.lock().unwrap().push(format!("pre:{}", self.label));
            if self.short_circuit {
                exchange.response.set_complete();
                return Ok(());
            }
            chain.filter(exchange).await?;
            self.log.lock().unwrap().push(format!("post:{}", self.label));
            Ok(())
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    pub fn recording(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn GatewayFilter> {
        Arc::new(Recording {
            label,
            log: log.clone(),
            short_circuit: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::sync::Mutex;

    use axum::http::Method;

    #[tokio::test]
    async fn chain_runs_pre_in_order_and_post_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let filters = vec![
            OrderedFilter::new(recording("a", &log), 1),
            OrderedFilter::new(recording("b", &log), 2),
        ];

        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        GatewayFilterChain::new(&filters).filter(&mut ex).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["pre:a", "pre:b", "post:b", "post:a"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_remaining_filters() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stopper = Arc::new(Recording {
            label: "stop",
            log: log.clone(),
            short_circuit: true,
        });
        let filters = vec![
            OrderedFilter::new(recording("a", &log), 1),
            OrderedFilter::new(stopper, 2),
            OrderedFilter::new(recording("c", &log), 3),
        ];

        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        GatewayFilterChain::new(&filters).filter(&mut ex).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["pre:a", "pre:stop", "post:a"]);
        assert!(ex.response.is_committed());
    }

    #[tokio::test]
    async fn empty_chain_completes() {
        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        let chain = GatewayFilterChain::new(&[]);
        assert_eq!(chain.remaining(), 0);
        chain.filter(&mut ex).await.unwrap();
    }

    #[test]
    fn sort_is_stable() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut filters = vec![
            OrderedFilter::new(recording("x", &log), 1),
            OrderedFilter::new(recording("y", &log), 0),
            OrderedFilter::new(recording("z", &log), 1),
        ];
        sort_filters(&mut filters);
        let names: Vec<_> = filters.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["y", "x", "z"]);
    }
}

//! Runs global plus route filters for one matched route.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{sort_filters, GatewayFilterChain, OrderedFilter};
use crate::error::GatewayResult;
use crate::http::ServerExchange;
use crate::route::Route;

/// Merges the global filters with the matched route's filters and executes
/// the combined chain.
///
/// The combined list is rebuilt and sorted on every request so a change to
/// the global set is visible on the very next request.
#[derive(Debug)]
pub struct FilteringWebHandler {
    global_filters: ArcSwap<Vec<OrderedFilter>>,
}

impl FilteringWebHandler {
    pub fn new(global_filters: Vec<OrderedFilter>) -> Self {
        Self {
            global_filters: ArcSwap::from_pointee(global_filters),
        }
    }

    pub fn global_filters(&self) -> Arc<Vec<OrderedFilter>> {
        self.global_filters.load_full()
    }

    pub fn replace_global_filters(&self, filters: Vec<OrderedFilter>) {
        self.global_filters.store(Arc::new(filters));
    }

    /// Global filters followed by the route's, stable-sorted by order.
    pub fn combined_filters(&self, route: &Route) -> Vec<OrderedFilter> {
        let globals = self.global_filters.load();
        let mut combined = Vec::with_capacity(globals.len() + route.filters().len());
        combined.extend(globals.iter().cloned());
        combined.extend(route.filters().iter().cloned());
        sort_filters(&mut combined);
        combined
    }

    pub async fn handle(&self, exchange: &mut ServerExchange, route: Arc<Route>) -> GatewayResult<()> {
        let combined = self.combined_filters(&route);
        tracing::debug!(route_id = %route.id(), filters = ?combined, "Sorted gateway filter chain");

        exchange.attributes.route = Some(route);
        GatewayFilterChain::new(&combined).filter(exchange).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::http::Method;

    use crate::filter::test_support::recording;
    use crate::predicate::predicate_fn;

    fn route(filters: Vec<OrderedFilter>) -> Arc<Route> {
        Arc::new(Route::new(
            "r1",
            "http://localhost:9000".parse().unwrap(),
            0,
            predicate_fn("always", |_| true),
            filters,
        ))
    }

    #[tokio::test]
    async fn interleaves_global_and_route_filters_by_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = FilteringWebHandler::new(vec![
            OrderedFilter::new(recording("g-first", &log), -10),
            OrderedFilter::new(recording("g-last", &log), 100),
            OrderedFilter::new(recording("g-tie", &log), 1),
        ]);
        let route = route(vec![
            OrderedFilter::new(recording("r1", &log), 1),
            OrderedFilter::new(recording("r2", &log), 2),
        ]);

        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        handler.handle(&mut ex, route).await.unwrap();

        let pre: Vec<_> = log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|l| l.strip_prefix("pre:").map(str::to_string))
            .collect();
        // equal orders keep globals ahead of route filters
        assert_eq!(pre, vec!["g-first", "g-tie", "r1", "r2", "g-last"]);
        assert_eq!(ex.route_id(), "r1");
    }

    #[tokio::test]
    async fn replaced_globals_apply_to_next_request() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = FilteringWebHandler::new(Vec::new());
        let route = route(Vec::new());

        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        handler.handle(&mut ex, route.clone()).await.unwrap();
        assert!(log.lock().unwrap().is_empty());

        handler.replace_global_filters(vec![OrderedFilter::new(recording("late", &log), 0)]);
        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        handler.handle(&mut ex, route).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["pre:late", "post:late"]);
    }
}

//! Compiled route snapshot with explicit refresh.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Route, RouteLocator};
use crate::error::GatewayResult;
use crate::observability::metrics;

/// Holds the last successfully compiled, order-sorted route list.
///
/// Readers load the snapshot without locking. Refreshes are serialized so
/// two concurrent refreshes cannot store out of order.
pub struct CachingRouteLocator {
    delegate: Arc<dyn RouteLocator>,
    snapshot: ArcSwap<Vec<Arc<Route>>>,
    refresh_lock: Mutex<()>,
}

impl CachingRouteLocator {
    /// Compile once up front; a failing source starts with no routes.
    pub async fn new(delegate: Arc<dyn RouteLocator>) -> Self {
        let locator = Self {
            delegate,
            snapshot: ArcSwap::from_pointee(Vec::new()),
            refresh_lock: Mutex::new(()),
        };
        if let Err(e) = locator.refresh().await {
            tracing::error!(error = %e, "Initial route compilation failed");
        }
        locator
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Route>>> {
        self.snapshot.load_full()
    }

    /// Recompile and swap in the result. On error the old snapshot stays.
    pub async fn refresh(&self) -> GatewayResult<usize> {
        let _guard = self.refresh_lock.lock().await;

        let mut routes = self.delegate.routes().await?;
        routes.sort_by_key(|r| r.order());
        let count = routes.len();

        self.snapshot.store(Arc::new(routes));
        metrics::set_routes_active(count);
        tracing::info!(routes = count, "Routes refreshed");
        Ok(count)
    }
}

#[async_trait]
impl RouteLocator for CachingRouteLocator {
    async fn routes(&self) -> GatewayResult<Vec<Arc<Route>>> {
        Ok(self.snapshot().as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::error::GatewayError;
    use crate::predicate::predicate_fn;

    /// Serves a fixed list, or fails when asked to.
    struct Scripted {
        routes: std::sync::Mutex<Vec<(String, i32)>>,
        fail: AtomicBool,
    }

    impl Scripted {
        fn new(routes: &[(&str, i32)]) -> Arc<Self> {
            Arc::new(Self {
                routes: std::sync::Mutex::new(routes.iter().map(|(id, o)| (id.to_string(), *o)).collect()),
                fail: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl RouteLocator for Scripted {
        async fn routes(&self) -> GatewayResult<Vec<Arc<Route>>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::InvalidRequest("source down".into()));
            }
            Ok(self
                .routes
                .lock()
                .unwrap()
                .iter()
                .map(|(id, order)| {
                    Arc::new(Route::new(
                        id.clone(),
                        "http://localhost:9000".parse().unwrap(),
                        *order,
                        predicate_fn("always", |_| true),
                        Vec::new(),
                    ))
                })
                .collect())
        }
    }

    fn ids(cache: &CachingRouteLocator) -> Vec<String> {
        cache.snapshot().iter().map(|r| r.id().to_string()).collect()
    }

    #[tokio::test]
    async fn sorts_by_order_stably() {
        let source = Scripted::new(&[("b", 1), ("a", 0), ("c", 1), ("first", -5)]);
        let cache = CachingRouteLocator::new(source).await;
        assert_eq!(ids(&cache), vec!["first", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn snapshot_changes_only_on_refresh() {
        let source = Scripted::new(&[("a", 0)]);
        let cache = CachingRouteLocator::new(source.clone()).await;

        source.routes.lock().unwrap().push(("b".into(), 0));
        assert_eq!(ids(&cache), vec!["a"]);

        assert_eq!(cache.refresh().await.unwrap(), 2);
        assert_eq!(ids(&cache), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let source = Scripted::new(&[("a", 0)]);
        let cache = CachingRouteLocator::new(source.clone()).await;
        let before = cache.snapshot();

        source.fail.store(true, Ordering::SeqCst);
        assert!(cache.refresh().await.is_err());
        assert!(Arc::ptr_eq(&before, &cache.snapshot()));
    }

    #[tokio::test]
    async fn refresh_without_changes_is_idempotent() {
        use crate::config::GatewayProperties;
        use crate::route::compiler::test_support::compiler;
        use crate::route::{InMemoryRouteDefinitionRepository, RouteDefinitionRepository};

        let repo = Arc::new(InMemoryRouteDefinitionRepository::new());
        for text in [
            "users=http://localhost:9001,Path=/users/**",
            "orders=lb://orders,Path=/orders/**,Method=GET",
            "status=http://localhost:9002,Path=/status",
        ] {
            let mut def: crate::route::RouteDefinition = text.parse().unwrap();
            def.order = if def.id == "status" { -1 } else { 0 };
            repo.save(def).await.unwrap();
        }
        let cache = CachingRouteLocator::new(Arc::new(compiler(repo, GatewayProperties::default()))).await;

        let shape = |cache: &CachingRouteLocator| -> Vec<(String, String, i32)> {
            cache
                .snapshot()
                .iter()
                .map(|r| (r.id().to_string(), r.uri().to_string(), r.order()))
                .collect()
        };

        let first = shape(&cache);
        assert_eq!(cache.refresh().await.unwrap(), 3);
        let second = shape(&cache);
        assert_eq!(cache.refresh().await.unwrap(), 3);

        assert_eq!(first.len(), 3);
        assert_eq!(first[0].0, "status");
        assert_eq!(first, second);
        assert_eq!(second, shape(&cache));
    }
}

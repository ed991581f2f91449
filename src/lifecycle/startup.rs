//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Start background tasks (config watcher, signals, bucket sweeper)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)
//! - Shared components (`@defaultReplenishRate`, ...) are fixed at startup;
//!   a reload changes routes, default filters and the service catalog

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use super::{signals, Shutdown};
use crate::admin;
use crate::config::{ConfigError, ConfigWatcher, GatewayConfig, GatewayProperties};
use crate::factory::{ArgumentResolver, ComponentRegistry};
use crate::filter::factory::builtin_factories as builtin_filters;
use crate::filter::global::default_global_filters;
use crate::filter::FilteringWebHandler;
use crate::http::{HttpServer, RoutePredicateHandlerMapping};
use crate::load_balancer::{LoadBalancerClient, StaticDiscoveryClient};
use crate::observability::metrics;
use crate::predicate::builtin_factories as builtin_predicates;
use crate::ratelimit::TokenBucketRateLimiter;
use crate::route::{
    CachingRouteLocator, CompositeRouteDefinitionLocator, DiscoveryClientRouteDefinitionLocator,
    InMemoryRouteDefinitionRepository, PropertiesRouteDefinitionLocator, RouteDefinitionLocator,
    RouteDefinitionRouteLocator,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid discovery configuration: {0}")]
    Discovery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Every long-lived piece of the running gateway.
pub struct GatewayContext {
    config: GatewayConfig,
    properties: Arc<ArcSwap<GatewayProperties>>,
    repository: Arc<InMemoryRouteDefinitionRepository>,
    definitions: Arc<dyn RouteDefinitionLocator>,
    compiler: Arc<RouteDefinitionRouteLocator>,
    routes: Arc<CachingRouteLocator>,
    mapping: RoutePredicateHandlerMapping,
    handler: FilteringWebHandler,
    discovery: Arc<StaticDiscoveryClient>,
    load_balancer: Arc<LoadBalancerClient>,
    rate_limiter: Arc<TokenBucketRateLimiter>,
}

impl GatewayContext {
    /// Wire the route engine and compile the first snapshot.
    pub async fn build(config: GatewayConfig) -> Result<Self, StartupError> {
        let properties = Arc::new(ArcSwap::from_pointee(config.gateway.clone()));
        let discovery = Arc::new(
            StaticDiscoveryClient::from_config(&config.discovery.services).map_err(StartupError::Discovery)?,
        );
        let rate_limiter = Arc::new(TokenBucketRateLimiter::new());

        let predicates = Arc::new(builtin_predicates());
        let filters = Arc::new(builtin_filters(rate_limiter.clone()));
        let components = ComponentRegistry::with_defaults(&config.rate_limiter, rate_limiter.clone());
        tracing::info!(
            predicates = predicates.len(),
            filters = filters.len(),
            components = components.names().count(),
            "Factories registered"
        );

        let repository = Arc::new(InMemoryRouteDefinitionRepository::new());
        let from_config: Arc<dyn RouteDefinitionLocator> =
            Arc::new(PropertiesRouteDefinitionLocator::new(properties.clone()));
        let from_repository: Arc<dyn RouteDefinitionLocator> = repository.clone();
        let mut sources = vec![from_config, from_repository];
        if config.discovery.enabled {
            sources.push(Arc::new(DiscoveryClientRouteDefinitionLocator::new(
                discovery.clone(),
                config.discovery.route_id_prefix.clone(),
            )));
        }
        let definitions: Arc<dyn RouteDefinitionLocator> = Arc::new(CompositeRouteDefinitionLocator::new(sources));

        let compiler = Arc::new(RouteDefinitionRouteLocator::new(
            definitions.clone(),
            predicates,
            filters,
            ArgumentResolver::new(Arc::new(components)),
            properties.clone(),
        ));
        let routes = Arc::new(CachingRouteLocator::new(compiler.clone()).await);

        let load_balancer = Arc::new(LoadBalancerClient::new(discovery.clone()));
        let handler = FilteringWebHandler::new(default_global_filters(load_balancer.clone(), &config.timeouts));

        Ok(Self {
            mapping: RoutePredicateHandlerMapping::new(routes.clone()),
            config,
            properties,
            repository,
            definitions,
            compiler,
            routes,
            handler,
            discovery,
            load_balancer,
            rate_limiter,
        })
    }

    /// Configuration the gateway was started with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn properties(&self) -> &Arc<ArcSwap<GatewayProperties>> {
        &self.properties
    }

    pub fn repository(&self) -> &Arc<InMemoryRouteDefinitionRepository> {
        &self.repository
    }

    /// All definition sources merged.
    pub fn definitions(&self) -> &Arc<dyn RouteDefinitionLocator> {
        &self.definitions
    }

    pub fn compiler(&self) -> &RouteDefinitionRouteLocator {
        &self.compiler
    }

    pub fn routes(&self) -> &Arc<CachingRouteLocator> {
        &self.routes
    }

    pub fn mapping(&self) -> &RoutePredicateHandlerMapping {
        &self.mapping
    }

    pub fn handler(&self) -> &FilteringWebHandler {
        &self.handler
    }

    pub fn load_balancer(&self) -> &Arc<LoadBalancerClient> {
        &self.load_balancer
    }

    pub fn rate_limiter(&self) -> &Arc<TokenBucketRateLimiter> {
        &self.rate_limiter
    }

    /// Swap in a reloaded configuration and refresh routes.
    pub async fn apply_config(&self, config: GatewayConfig) {
        if let Err(e) = self.discovery.replace(&config.discovery.services) {
            tracing::error!(error = %e, "Rejecting reloaded config");
            return;
        }
        let pruned = self.load_balancer.prune().await;
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped balancers of removed services");
        }
        self.properties.store(Arc::new(config.gateway));
        match self.routes.refresh().await {
            Ok(count) => tracing::info!(routes = count, "Configuration reloaded"),
            Err(e) => tracing::error!(error = %e, "Route refresh after reload failed"),
        }
    }
}

/// Periodically drop rate limiter buckets that refilled completely.
fn spawn_bucket_sweeper(limiter: Arc<TokenBucketRateLimiter>, every: Duration, shutdown: &Shutdown) {
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = limiter.evict_full(Instant::now());
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = limiter.tracked_keys(), "Swept rate limiter buckets");
                    }
                }
                _ = stop.recv() => break,
            }
        }
    });
}

/// Start every subsystem and serve until shutdown.
pub async fn run(config: GatewayConfig, config_path: Option<PathBuf>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let gateway = Arc::new(GatewayContext::build(config.clone()).await?);
    let shutdown = Shutdown::new();

    tokio::spawn(signals::listen(shutdown.clone(), gateway.routes().clone()));
    spawn_bucket_sweeper(
        gateway.rate_limiter().clone(),
        Duration::from_secs(config.rate_limiter.sweep_interval_secs.max(1)),
        &shutdown,
    );

    // the watcher handle must outlive the server
    let (_watcher, config_updates) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(&path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = admin::setup_admin_router(gateway.clone());
        let mut stop = shutdown.subscribe();
        tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API server failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(gateway)
        .run(listener, config_updates, shutdown.subscribe())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{RouteDefinition, RouteDefinitionRepository};

    fn config_with_shorthand(shorthand: &str) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.observability.metrics_enabled = false;
        config.gateway.route_shorthands = vec![shorthand.to_string()];
        config
    }

    #[tokio::test]
    async fn builds_initial_snapshot() {
        let gateway = GatewayContext::build(config_with_shorthand("a=http://localhost:9000,Path=/a/**"))
            .await
            .unwrap();
        let ids: Vec<_> = gateway.routes().snapshot().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn reload_swaps_routes() {
        let gateway = GatewayContext::build(config_with_shorthand("a=http://localhost:9000,Path=/a/**"))
            .await
            .unwrap();

        gateway
            .apply_config(config_with_shorthand("b=http://localhost:9000,Path=/b/**"))
            .await;
        let ids: Vec<_> = gateway.routes().snapshot().iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn repository_routes_need_refresh() {
        let gateway = GatewayContext::build(config_with_shorthand("a=http://localhost:9000,Path=/a/**"))
            .await
            .unwrap();
        let def: RouteDefinition = "saved=http://localhost:9000,Path=/saved".parse().unwrap();
        gateway.repository().save(def).await.unwrap();

        assert_eq!(gateway.routes().snapshot().len(), 1);
        assert_eq!(gateway.routes().refresh().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn discovery_routes_when_enabled() {
        let mut config = GatewayConfig::default();
        config.discovery.enabled = true;
        config
            .discovery
            .services
            .insert("users".into(), vec!["127.0.0.1:9100".into()]);

        let gateway = GatewayContext::build(config).await.unwrap();
        let snapshot = gateway.routes().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), "discovery_users");
        assert_eq!(snapshot[0].uri().as_str(), "lb://users");
    }

    #[tokio::test]
    async fn reload_forgets_removed_services() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_enabled = false;
        config
            .discovery
            .services
            .insert("users".into(), vec!["127.0.0.1:9100".into()]);
        let gateway = GatewayContext::build(config.clone()).await.unwrap();

        assert!(gateway.load_balancer().choose("users").await.is_some());
        assert_eq!(gateway.load_balancer().tracked_services(), 1);

        config.discovery.services.clear();
        gateway.apply_config(config).await;
        assert_eq!(gateway.load_balancer().tracked_services(), 0);
    }
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all gateway handler
//! - Wire up middleware (tracing, limits, request ID)
//! - Bind server to listener
//! - Dispatch requests: route lookup, then the filter chain
//! - Apply validated configuration updates while serving

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::{response, ServerExchange};
use crate::lifecycle::startup::GatewayContext;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayContext>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    gateway: Arc<GatewayContext>,
}

impl HttpServer {
    pub fn new(gateway: Arc<GatewayContext>) -> Self {
        let state = AppState {
            gateway: gateway.clone(),
        };
        let router = Self::build_router(gateway.config(), state);
        Self { router, gateway }
    }

    /// The router with all middleware, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                // outermost first: the request id exists before tracing starts
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Serve until the shutdown signal, applying configuration updates as
    /// they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let gateway = self.gateway.clone();
        let updater = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                gateway.apply_config(config).await;
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        updater.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}

/// Catch-all handler: match a route and run its filter chain.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let mut exchange = ServerExchange::new(request, remote_addr);
    let gateway = &state.gateway;

    if let Some(name) = gateway.properties().load().principal_header.as_deref() {
        exchange.request.principal = exchange
            .request
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }

    tracing::debug!(
        request_id = exchange.attributes.request_id.as_deref().unwrap_or("unknown"),
        method = %exchange.request.method,
        path = %exchange.request.path(),
        "Dispatching request"
    );

    let Some(route) = gateway.mapping().lookup(&exchange) else {
        metrics::record_request(exchange.request.method.as_str(), 404, "none", start);
        return response::no_route(exchange.request.path());
    };

    let result = gateway.handler().handle(&mut exchange, route).await;
    response::finish(exchange, result)
}

//! Administrative API.
//!
//! # Data Flow
//! ```text
//! gateway-cli / curl
//!     → auth.rs (bearer token)
//!     → handlers.rs
//!         - route definitions → InMemoryRouteDefinitionRepository
//!         - refresh → CachingRouteLocator::refresh
//!         - filter listings → FilteringWebHandler, filter factory registry
//! ```
//!
//! # Design Decisions
//! - Saving or deleting a definition does not refresh; clients call
//!   `POST /refresh` when ready
//! - Served on its own listener so it can stay on a private interface

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::GatewayContext;

pub const ADMIN_PREFIX: &str = "/admin/gateway";

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub gateway: Arc<GatewayContext>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(gateway: Arc<GatewayContext>) -> Router {
    let state = AdminState {
        api_key: Arc::from(gateway.config().admin.api_key.as_str()),
        gateway,
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/gateway/routes", get(list_routes))
        .route(
            "/admin/gateway/routes/{id}",
            get(get_route).post(save_route).delete(delete_route),
        )
        .route("/admin/gateway/routes/{id}/combinedfilters", get(combined_filters))
        .route("/admin/gateway/refresh", post(refresh))
        .route("/admin/gateway/globalfilters", get(global_filters))
        .route("/admin/gateway/routefilters", get(route_filters))
        .route("/admin/gateway/routepredicates", get(route_predicates))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

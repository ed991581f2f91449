use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::{AdminState, ADMIN_PREFIX};
use crate::error::{GatewayError, GatewayResult};
use crate::filter::OrderedFilter;
use crate::route::{RouteDefinition, RouteDefinitionLocator, RouteDefinitionRepository, RouteView};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub routes: usize,
    pub rate_limit_keys: usize,
}

#[derive(Serialize)]
pub struct RouteListing {
    pub definitions: Vec<RouteDefinition>,
    pub routes: Vec<RouteView>,
}

#[derive(Serialize)]
pub struct FilterEntry {
    pub name: String,
    pub order: i32,
}

impl From<&OrderedFilter> for FilterEntry {
    fn from(f: &OrderedFilter) -> Self {
        Self {
            name: f.name().to_string(),
            order: f.order,
        }
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        routes: state.gateway.routes().snapshot().len(),
        rate_limit_keys: state.gateway.rate_limiter().tracked_keys(),
    })
}

pub async fn list_routes(State(state): State<AdminState>) -> GatewayResult<Json<RouteListing>> {
    let definitions = state.gateway.definitions().route_definitions().await?;
    let routes = state.gateway.routes().snapshot().iter().map(|r| r.view()).collect();
    Ok(Json(RouteListing { definitions, routes }))
}

pub async fn get_route(State(state): State<AdminState>, Path(id): Path<String>) -> GatewayResult<Json<RouteView>> {
    state
        .gateway
        .routes()
        .snapshot()
        .iter()
        .find(|r| r.id() == id)
        .map(|r| Json(r.view()))
        .ok_or(GatewayError::NotFound(id))
}

/// Store a definition under the path id. Takes effect on the next refresh.
pub async fn save_route(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    Json(mut definition): Json<RouteDefinition>,
) -> GatewayResult<Response> {
    definition.id = id.clone();
    state.gateway.repository().save(definition).await?;
    tracing::info!(route_id = %id, "Route definition saved");

    let location = format!("{}/routes/{}", ADMIN_PREFIX, id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}

pub async fn delete_route(State(state): State<AdminState>, Path(id): Path<String>) -> GatewayResult<StatusCode> {
    state.gateway.repository().delete(&id).await?;
    tracing::info!(route_id = %id, "Route definition deleted");
    Ok(StatusCode::OK)
}

pub async fn refresh(State(state): State<AdminState>) -> GatewayResult<Json<serde_json::Value>> {
    let count = state.gateway.routes().refresh().await?;
    Ok(Json(serde_json::json!({ "routes": count })))
}

pub async fn global_filters(State(state): State<AdminState>) -> Json<Vec<FilterEntry>> {
    let filters = state.gateway.handler().global_filters();
    Json(filters.iter().map(FilterEntry::from).collect())
}

pub async fn route_filters(State(state): State<AdminState>) -> Json<Vec<String>> {
    Json(
        state
            .gateway
            .compiler()
            .filter_factories()
            .names()
            .map(str::to_string)
            .collect(),
    )
}

pub async fn route_predicates(State(state): State<AdminState>) -> Json<Vec<String>> {
    Json(
        state
            .gateway
            .compiler()
            .predicate_factories()
            .names()
            .map(str::to_string)
            .collect(),
    )
}

pub async fn combined_filters(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> GatewayResult<Json<Vec<FilterEntry>>> {
    let snapshot = state.gateway.routes().snapshot();
    let route = snapshot
        .iter()
        .find(|r| r.id() == id)
        .ok_or_else(|| GatewayError::NotFound(id.clone()))?;
    let combined = state.gateway.handler().combined_filters(route);
    Ok(Json(combined.iter().map(FilterEntry::from).collect()))
}

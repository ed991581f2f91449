//! Response handling at the transport boundary.
//!
//! # Responsibilities
//! - Turn a finished exchange into the client response
//! - Map chain errors to status codes and JSON bodies
//! - Answer requests no route matched
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Upstream hop-by-hop headers are already stripped by the routing filter
//! - Backend timeouts result in 504 Gateway Timeout

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::GatewayResult;
use crate::http::ServerExchange;

/// 404 for a request no route predicate accepted.
pub fn no_route(path: &str) -> Response {
    let body = Json(json!({
        "error": {
            "code": "NO_ROUTE",
            "message": format!("no route matches '{}'", path),
        }
    }));
    (StatusCode::NOT_FOUND, body).into_response()
}

/// Client response for a completed chain.
pub fn finish(exchange: ServerExchange, result: GatewayResult<()>) -> Response {
    match result {
        Ok(()) => exchange.into_response(),
        Err(e) => {
            tracing::warn!(
                request_id = exchange.attributes.request_id.as_deref().unwrap_or("unknown"),
                route_id = %exchange.route_id(),
                error = %e,
                "Filter chain failed"
            );
            e.into_response()
        }
    }
}

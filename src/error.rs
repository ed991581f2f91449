//! Gateway error taxonomy.
//!
//! # Design Decisions
//! - Definition and argument errors are contained per route by the compiler
//! - Filter errors propagate untouched to the transport boundary, where
//!   `IntoResponse` maps them to a status code
//! - Rate limiting is not an error; a rejected request is a normal outcome

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the route engine and the request pipeline.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed textual route, predicate or filter shorthand.
    #[error("unable to parse {kind} text '{text}', must be of the form name=value")]
    Parse { kind: &'static str, text: String },

    /// A route definition violates a structural invariant.
    #[error("invalid route definition '{id}': {reason}")]
    InvalidRoute { id: String, reason: String },

    #[error("unable to find predicate factory with name {0}")]
    UnknownPredicateFactory(String),

    #[error("unable to find filter factory with name {0}")]
    UnknownFilterFactory(String),

    #[error("wrong number of arguments: expected {expected:?}, found {found}")]
    ArgumentCountMismatch { expected: Vec<String>, found: usize },

    #[error("missing argument '{name}'")]
    MissingArgument { name: String },

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// Failure while evaluating a `#{ }` argument expression.
    #[error("cannot evaluate expression '{expression}': {reason}")]
    Expression { expression: String, reason: String },

    /// Repository lookup or delete on an absent id.
    #[error("route definition not found: {0}")]
    NotFound(String),

    /// No instance could be chosen for an `lb://` target.
    #[error("no instances available for service '{0}'")]
    ServiceUnavailable(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("upstream request timed out after {0:?}")]
    UpstreamTimeout(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub(crate) fn invalid_argument(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// HTTP status and machine-readable code for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::Parse { .. } => (StatusCode::BAD_REQUEST, "PARSE_ERROR"),
            GatewayError::InvalidRoute { .. } => (StatusCode::BAD_REQUEST, "INVALID_ROUTE"),
            GatewayError::UnknownPredicateFactory(_) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_PREDICATE_FACTORY")
            }
            GatewayError::UnknownFilterFactory(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_FILTER_FACTORY"),
            GatewayError::ArgumentCountMismatch { .. } => {
                (StatusCode::BAD_REQUEST, "ARGUMENT_COUNT_MISMATCH")
            }
            GatewayError::MissingArgument { .. } => (StatusCode::BAD_REQUEST, "MISSING_ARGUMENT"),
            GatewayError::InvalidArgument { .. } => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            GatewayError::Expression { .. } => (StatusCode::BAD_REQUEST, "EXPRESSION_ERROR"),
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GatewayError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            GatewayError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            GatewayError::UpstreamTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

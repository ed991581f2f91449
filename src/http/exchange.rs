//! Per-request exchange state.
//!
//! # Responsibilities
//! - Carry the inbound request (possibly rewritten by filters)
//! - Collect the response being built by filters and the routing filter
//! - Hold typed attributes shared between filters (matched route, target URL)
//!
//! # Design Decisions
//! - One exchange per request, owned by the dispatching task; filters get `&mut`
//! - Predicates only ever see `&ServerExchange` and must not mutate it
//! - A committed response tells later filters that the chain was answered

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::route::Route;

/// The inbound request as seen (and rewritten) by the filter chain.
#[derive(Debug)]
pub struct GatewayRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    /// Taken by the routing filter when forwarding.
    pub body: BodySlot,
    pub remote_addr: Option<SocketAddr>,
    /// Authenticated principal name as established by the transport.
    pub principal: Option<String>,
}

impl GatewayRequest {
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Decoded query parameters in order of appearance.
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Host from the `Host` header, falling back to the URI authority, port stripped.
    pub fn host(&self) -> Option<&str> {
        let raw = self
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.uri.host())?;
        Some(strip_port(raw))
    }

    /// Cookies sent in the `Cookie` header(s).
    pub fn cookies(&self) -> HashMap<&str, &str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.trim(), value.trim()))
            })
            .collect()
    }

    /// Replace path and query, keeping scheme and authority.
    pub fn set_path_and_query(&mut self, path: &str, query: Option<&str>) -> GatewayResult<()> {
        let path_and_query = match query {
            Some(q) if !q.is_empty() => format!("{}?{}", path, q),
            _ => path.to_string(),
        };

        let mut parts = self.uri.clone().into_parts();
        parts.path_and_query = Some(
            path_and_query
                .parse()
                .map_err(|e| GatewayError::InvalidRequest(format!("invalid path '{}': {}", path, e)))?,
        );
        self.uri = Uri::from_parts(parts)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid uri: {}", e)))?;
        Ok(())
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal
        return host.split(']').next().map(|h| &host[..h.len() + 1]).unwrap_or(host);
    }
    host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host)
}

/// Holds a streaming body so the exchange stays `Sync`.
///
/// Only accessed through `&mut`, so the lock is never contended.
#[derive(Debug, Default)]
pub struct BodySlot(Mutex<Option<Body>>);

impl BodySlot {
    pub fn new(body: Body) -> Self {
        Self(Mutex::new(Some(body)))
    }

    pub fn take(&mut self) -> Option<Body> {
        self.0.get_mut().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn set(&mut self, body: Body) {
        *self.0.get_mut().unwrap_or_else(|e| e.into_inner()) = Some(body);
    }
}

/// The response under construction.
#[derive(Debug, Default)]
pub struct GatewayResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: BodySlot,
    committed: bool,
}

impl GatewayResponse {
    /// Mark the response as final; the routing filter will not forward.
    pub fn set_complete(&mut self) {
        self.committed = true;
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

/// Typed attributes shared across filters for one request.
#[derive(Debug, Default)]
pub struct ExchangeAttributes {
    /// Route chosen by the handler mapping.
    pub route: Option<Arc<Route>>,
    /// Fully resolved upstream URL, set by the request-url global filter.
    pub request_url: Option<Url>,
    /// Request URI before any filter rewrote it.
    pub original_uri: Option<Uri>,
    /// Set once the request was forwarded upstream.
    pub already_routed: bool,
    pub request_id: Option<String>,
}

/// Request context flowing through predicates and the filter chain.
#[derive(Debug)]
pub struct ServerExchange {
    pub request: GatewayRequest,
    pub response: GatewayResponse,
    pub attributes: ExchangeAttributes,
}

impl ServerExchange {
    /// Build an exchange from an inbound axum request.
    pub fn new(request: Request<Body>, remote_addr: Option<SocketAddr>) -> Self {
        let (parts, body) = request.into_parts();
        let request_id = parts
            .headers
            .get(crate::http::X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            attributes: ExchangeAttributes {
                original_uri: Some(parts.uri.clone()),
                request_id,
                ..Default::default()
            },
            request: GatewayRequest {
                method: parts.method,
                uri: parts.uri,
                version: parts.version,
                headers: parts.headers,
                body: BodySlot::new(body),
                remote_addr,
                principal: None,
            },
            response: GatewayResponse::default(),
        }
    }

    /// Bodyless exchange for a method and URI, mostly useful for tests and tooling.
    pub fn from_parts(method: Method, uri: &str) -> GatewayResult<Self> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        Ok(Self::new(request, None))
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.attributes.route.as_ref()
    }

    pub fn route_id(&self) -> &str {
        self.attributes
            .route
            .as_ref()
            .map(|r| r.id())
            .unwrap_or("none")
    }

    /// Convert the built response for the transport.
    pub fn into_response(mut self) -> Response {
        let body = self.response.body.take().unwrap_or_else(Body::empty);
        let mut response = Response::new(body);
        *response.status_mut() = self.response.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.response.headers;
        response.into_response()
    }
}

//! Header manipulation filters.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use super::{GatewayFilterFactory, SharedFilter};
use crate::error::{GatewayError, GatewayResult};
use crate::factory::{ArgumentBundle, ArgumentHints, Factory};
use crate::filter::{GatewayFilter, GatewayFilterChain};
use crate::http::ServerExchange;

const NAME_KEY: &str = "name";
const VALUE_KEY: &str = "value";

/// Connection-scoped headers that must not be forwarded by a proxy.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub fn remove_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

pub(crate) fn header_name(args: &ArgumentBundle, key: &str) -> GatewayResult<HeaderName> {
    HeaderName::from_bytes(args.string(key)?.as_bytes())
        .map_err(|e| GatewayError::invalid_argument(key, e))
}

pub(crate) fn header_value(args: &ArgumentBundle, key: &str) -> GatewayResult<HeaderValue> {
    HeaderValue::from_str(&args.string(key)?).map_err(|e| GatewayError::invalid_argument(key, e))
}

/// Which header operation a [`HeaderFilter`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOp {
    AddRequest,
    RemoveRequest,
    AddResponse,
    SetResponse,
    RemoveResponse,
}

impl HeaderOp {
    fn factory_name(self) -> &'static str {
        match self {
            HeaderOp::AddRequest => "AddRequestHeader",
            HeaderOp::RemoveRequest => "RemoveRequestHeader",
            HeaderOp::AddResponse => "AddResponseHeader",
            HeaderOp::SetResponse => "SetResponseHeader",
            HeaderOp::RemoveResponse => "RemoveResponseHeader",
        }
    }

    fn takes_value(self) -> bool {
        matches!(
            self,
            HeaderOp::AddRequest | HeaderOp::AddResponse | HeaderOp::SetResponse
        )
    }
}

pub struct HeaderFilter {
    op: HeaderOp,
    name: HeaderName,
    value: Option<HeaderValue>,
}

impl fmt::Debug for HeaderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}({}, {:?})", self.op.factory_name(), self.name, v),
            None => write!(f, "{}({})", self.op.factory_name(), self.name),
        }
    }
}

#[async_trait]
impl GatewayFilter for HeaderFilter {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        match (self.op, &self.value) {
            (HeaderOp::AddRequest, Some(value)) => {
                exchange.request.headers.append(self.name.clone(), value.clone());
            }
            (HeaderOp::RemoveRequest, _) => {
                exchange.request.headers.remove(&self.name);
            }
            _ => {}
        }

        chain.filter(exchange).await?;

        let headers = &mut exchange.response.headers;
        match (self.op, &self.value) {
            (HeaderOp::AddResponse, Some(value)) => {
                headers.append(self.name.clone(), value.clone());
            }
            (HeaderOp::SetResponse, Some(value)) => {
                headers.insert(self.name.clone(), value.clone());
            }
            (HeaderOp::RemoveResponse, _) => {
                headers.remove(&self.name);
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.op.factory_name()
    }
}

/// Factory for the five single-header operations.
#[derive(Debug, Clone, Copy)]
pub struct HeaderGatewayFilterFactory {
    op: HeaderOp,
}

impl HeaderGatewayFilterFactory {
    pub const fn new(op: HeaderOp) -> Self {
        Self { op }
    }
}

impl ArgumentHints for HeaderGatewayFilterFactory {
    fn arg_names(&self) -> &[&'static str] {
        if self.op.takes_value() {
            &[NAME_KEY, VALUE_KEY]
        } else {
            &[NAME_KEY]
        }
    }
}

impl Factory for HeaderGatewayFilterFactory {
    fn name(&self) -> &str {
        self.op.factory_name()
    }
}

impl GatewayFilterFactory for HeaderGatewayFilterFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        let value = if self.op.takes_value() {
            Some(header_value(args, VALUE_KEY)?)
        } else {
            None
        };
        Ok(Arc::new(HeaderFilter {
            op: self.op,
            name: header_name(args, NAME_KEY)?,
            value,
        }))
    }
}

#[derive(Debug)]
struct RemoveNonProxyHeaders;

#[async_trait]
impl GatewayFilter for RemoveNonProxyHeaders {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        remove_hop_by_hop(&mut exchange.request.headers);
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "RemoveNonProxyHeaders"
    }
}

/// Strips hop-by-hop request headers. Applied to every route by default.
#[derive(Debug, Default)]
pub struct RemoveNonProxyHeadersGatewayFilterFactory;

impl ArgumentHints for RemoveNonProxyHeadersGatewayFilterFactory {}

impl Factory for RemoveNonProxyHeadersGatewayFilterFactory {
    fn name(&self) -> &str {
        "RemoveNonProxyHeaders"
    }
}

impl GatewayFilterFactory for RemoveNonProxyHeadersGatewayFilterFactory {
    fn apply(&self, _args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        Ok(Arc::new(RemoveNonProxyHeaders))
    }
}

const SECURE_HEADERS: &[(&str, &str)] = &[
    ("x-xss-protection", "1; mode=block"),
    ("strict-transport-security", "max-age=631138519"),
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    (
        "content-security-policy",
        "default-src 'self' https:; font-src 'self' https: data:; img-src 'self' https: data:; \
         object-src 'none'; script-src https:; style-src 'self' https: 'unsafe-inline'",
    ),
    ("x-download-options", "noopen"),
    ("x-permitted-cross-domain-policies", "none"),
];

#[derive(Debug)]
struct SecureHeaders;

#[async_trait]
impl GatewayFilter for SecureHeaders {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        chain.filter(exchange).await?;
        for (name, value) in SECURE_HEADERS {
            exchange
                .response
                .headers
                .insert(*name, HeaderValue::from_static(*value));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "SecureHeaders"
    }
}

/// Adds a fixed set of browser security headers to every response.
#[derive(Debug, Default)]
pub struct SecureHeadersGatewayFilterFactory;

impl ArgumentHints for SecureHeadersGatewayFilterFactory {}

impl Factory for SecureHeadersGatewayFilterFactory {
    fn name(&self) -> &str {
        "SecureHeaders"
    }
}

impl GatewayFilterFactory for SecureHeadersGatewayFilterFactory {
    fn apply(&self, _args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        Ok(Arc::new(SecureHeaders))
    }
}

//! Rate-limit key resolution.

use std::fmt;

use async_trait::async_trait;

use crate::http::ServerExchange;

/// Derives the caller identity a request is limited under.
///
/// `None` means the caller cannot be identified and the request is refused.
#[async_trait]
pub trait KeyResolver: Send + Sync + fmt::Debug {
    async fn resolve(&self, exchange: &ServerExchange) -> Option<String>;
}

/// Keys on the authenticated principal name.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrincipalNameKeyResolver;

#[async_trait]
impl KeyResolver for PrincipalNameKeyResolver {
    async fn resolve(&self, exchange: &ServerExchange) -> Option<String> {
        exchange.request.principal.clone()
    }
}

/// Keys on the client IP address.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteAddrKeyResolver;

#[async_trait]
impl KeyResolver for RemoteAddrKeyResolver {
    async fn resolve(&self, exchange: &ServerExchange) -> Option<String> {
        exchange.request.remote_addr.map(|addr| addr.ip().to_string())
    }
}

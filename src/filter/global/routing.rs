//! Terminal filter: forward the request upstream.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use super::ROUTING_FILTER_ORDER;
use crate::config::TimeoutConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::filter::factory::headers::remove_hop_by_hop;
use crate::filter::{GatewayFilter, GatewayFilterChain};
use crate::http::ServerExchange;

/// Pooled HTTP/1.1 client for upstream calls.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    response_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
            response_timeout: Duration::from_secs(timeouts.response_secs),
        }
    }
}

/// Sends the exchange's request to `request_url` and writes the upstream
/// response back into the exchange.
#[derive(Debug)]
pub struct HttpRoutingFilter {
    upstream: UpstreamClient,
}

impl HttpRoutingFilter {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    async fn forward(&self, exchange: &mut ServerExchange, uri: Uri) -> GatewayResult<()> {
        let request_id = exchange.attributes.request_id.clone().unwrap_or_default();
        let request = &mut exchange.request;

        let mut headers = request.headers.clone();
        // the client derives Host from the upstream authority
        headers.remove(header::HOST);

        let mut outbound = Request::builder()
            .method(request.method.clone())
            .uri(uri.clone())
            .body(request.body.take().unwrap_or_else(Body::empty))
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        *outbound.headers_mut() = headers;

        tracing::debug!(request_id = %request_id, upstream = %uri, "Forwarding request");

        let response: hyper::Response<Incoming> = match tokio::time::timeout(self.upstream.response_timeout, self.upstream.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, upstream = %uri, error = %e, "Upstream error");
                return Err(GatewayError::Upstream(e.to_string()));
            }
            Err(_) => {
                tracing::error!(request_id = %request_id, upstream = %uri, "Upstream timed out");
                return Err(GatewayError::UpstreamTimeout(self.upstream.response_timeout));
            }
        };

        let (mut parts, body) = response.into_parts();
        remove_hop_by_hop(&mut parts.headers);

        let target = &mut exchange.response;
        // headers set by earlier filters (rate limit counters) stay
        for (name, value) in parts.headers.iter() {
            target.headers.append(name.clone(), value.clone());
        }
        target.status = Some(parts.status);
        target.body.set(Body::new(body));
        exchange.attributes.already_routed = true;
        Ok(())
    }
}

#[async_trait]
impl GatewayFilter for HttpRoutingFilter {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        if exchange.response.is_committed() || exchange.attributes.already_routed {
            return chain.filter(exchange).await;
        }
        let url = match exchange.attributes.request_url.as_ref() {
            Some(url) => url,
            None => return chain.filter(exchange).await,
        };

        match url.scheme() {
            "http" => {}
            "https" => {
                return Err(GatewayError::Upstream(format!(
                    "https upstreams are not supported: {}",
                    url
                )))
            }
            _ => return chain.filter(exchange).await,
        }

        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|e| GatewayError::Upstream(format!("invalid upstream url '{}': {}", url, e)))?;

        self.forward(exchange, uri).await?;
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "HttpRouting"
    }

    fn order(&self) -> Option<i32> {
        Some(ROUTING_FILTER_ORDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::filter::OrderedFilter;

    fn routing() -> Vec<OrderedFilter> {
        let upstream = UpstreamClient::new(&TimeoutConfig {
            connect_secs: 1,
            response_secs: 1,
            request_secs: 5,
        });
        vec![OrderedFilter::new(Arc::new(HttpRoutingFilter::new(upstream)), 0)]
    }

    /// Accept one connection and answer with a fixed response.
    async fn one_shot_backend(response: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn forwards_and_merges_response_headers() {
        let addr = one_shot_backend(
            "HTTP/1.1 201 Created\r\nContent-Length: 2\r\nX-Backend: yes\r\nKeep-Alive: timeout=5\r\nConnection: close\r\n\r\nok",
        )
        .await;

        let mut ex = ServerExchange::from_parts(Method::POST, "/things").unwrap();
        ex.response.headers.insert("x-ratelimit-remaining", "4".parse().unwrap());
        ex.attributes.request_url = Some(format!("http://{}/things", addr).parse().unwrap());

        GatewayFilterChain::new(&routing()).filter(&mut ex).await.unwrap();

        assert!(ex.attributes.already_routed);
        assert_eq!(ex.response.status, Some(StatusCode::CREATED));
        assert_eq!(ex.response.headers["x-backend"], "yes");
        assert_eq!(ex.response.headers["x-ratelimit-remaining"], "4");
        assert!(ex.response.headers.get("keep-alive").is_none());
        assert!(ex.response.headers.get("connection").is_none());
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        ex.attributes.request_url = Some(format!("http://{}/", addr).parse().unwrap());

        let err = GatewayFilterChain::new(&routing()).filter(&mut ex).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
    }

    #[tokio::test]
    async fn committed_response_is_not_forwarded() {
        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        ex.response.set_complete();
        ex.attributes.request_url = Some("http://127.0.0.1:1/".parse().unwrap());

        GatewayFilterChain::new(&routing()).filter(&mut ex).await.unwrap();
        assert!(!ex.attributes.already_routed);
    }

    #[tokio::test]
    async fn https_is_rejected() {
        let mut ex = ServerExchange::from_parts(Method::GET, "/").unwrap();
        ex.attributes.request_url = Some("https://example.org/".parse().unwrap());

        let err = GatewayFilterChain::new(&routing()).filter(&mut ex).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
    }
}

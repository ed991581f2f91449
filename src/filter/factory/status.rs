//! Status-setting filters.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderValue, StatusCode};

use super::{GatewayFilterFactory, SharedFilter};
use crate::error::{GatewayError, GatewayResult};
use crate::factory::{ArgumentBundle, ArgumentHints, Factory};
use crate::filter::{GatewayFilter, GatewayFilterChain};
use crate::http::ServerExchange;

const STATUS_KEY: &str = "status";
const URL_KEY: &str = "url";

/// Accepts a numeric code (`404`) or a constant-style name (`NOT_FOUND`).
fn parse_status(text: &str) -> GatewayResult<StatusCode> {
    let text = text.trim();
    if let Ok(code) = text.parse::<u16>() {
        return StatusCode::from_u16(code).map_err(|e| GatewayError::invalid_argument(STATUS_KEY, e));
    }

    (100u16..600)
        .filter_map(|code| StatusCode::from_u16(code).ok())
        .find(|status| {
            status
                .canonical_reason()
                .map(|reason| reason.to_ascii_uppercase().replace([' ', '-'], "_") == text.to_ascii_uppercase())
                .unwrap_or(false)
        })
        .ok_or_else(|| GatewayError::invalid_argument(STATUS_KEY, format!("unknown status '{}'", text)))
}

#[derive(Debug)]
struct SetStatus {
    status: StatusCode,
}

#[async_trait]
impl GatewayFilter for SetStatus {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        chain.filter(exchange).await?;
        exchange.response.status = Some(self.status);
        Ok(())
    }

    fn name(&self) -> &str {
        "SetStatus"
    }
}

/// `SetStatus=401` or `SetStatus=UNAUTHORIZED`
#[derive(Debug, Default)]
pub struct SetStatusGatewayFilterFactory;

impl ArgumentHints for SetStatusGatewayFilterFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[STATUS_KEY]
    }
}

impl Factory for SetStatusGatewayFilterFactory {
    fn name(&self) -> &str {
        "SetStatus"
    }
}

impl GatewayFilterFactory for SetStatusGatewayFilterFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        Ok(Arc::new(SetStatus {
            status: parse_status(&args.string(STATUS_KEY)?)?,
        }))
    }
}

#[derive(Debug)]
struct RedirectTo {
    status: StatusCode,
    location: HeaderValue,
}

#[async_trait]
impl GatewayFilter for RedirectTo {
    async fn filter(&self, exchange: &mut ServerExchange, _chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        exchange.response.status = Some(self.status);
        exchange
            .response
            .headers
            .insert(header::LOCATION, self.location.clone());
        exchange.response.set_complete();
        Ok(())
    }

    fn name(&self) -> &str {
        "RedirectTo"
    }
}

/// `RedirectTo=302, https://example.org`. Ends the chain.
#[derive(Debug, Default)]
pub struct RedirectToGatewayFilterFactory;

impl ArgumentHints for RedirectToGatewayFilterFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[STATUS_KEY, URL_KEY]
    }
}

impl Factory for RedirectToGatewayFilterFactory {
    fn name(&self) -> &str {
        "RedirectTo"
    }
}

impl GatewayFilterFactory for RedirectToGatewayFilterFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        let status = parse_status(&args.string(STATUS_KEY)?)?;
        if !status.is_redirection() {
            return Err(GatewayError::invalid_argument(
                STATUS_KEY,
                format!("{} is not a 3xx status", status.as_u16()),
            ));
        }

        let url = args.string(URL_KEY)?;
        url::Url::parse(&url).map_err(|e| GatewayError::invalid_argument(URL_KEY, e))?;
        let location = HeaderValue::from_str(&url).map_err(|e| GatewayError::invalid_argument(URL_KEY, e))?;
        Ok(Arc::new(RedirectTo { status, location }))
    }
}

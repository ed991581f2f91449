//! Request path and query rewriting filters.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use super::{GatewayFilterFactory, SharedFilter};
use crate::error::{GatewayError, GatewayResult};
use crate::factory::{ArgumentBundle, ArgumentHints, Factory};
use crate::filter::{GatewayFilter, GatewayFilterChain};
use crate::http::ServerExchange;

const NAME_KEY: &str = "name";
const VALUE_KEY: &str = "value";
const PREFIX_KEY: &str = "prefix";
const TEMPLATE_KEY: &str = "template";
const REGEXP_KEY: &str = "regexp";
const REPLACEMENT_KEY: &str = "replacement";

fn set_path(exchange: &mut ServerExchange, path: &str) -> GatewayResult<()> {
    let query = exchange.request.query().map(str::to_string);
    exchange.request.set_path_and_query(path, query.as_deref())
}

#[derive(Debug)]
struct AddRequestParameter {
    /// Already form-encoded `name=value`.
    pair: String,
}

#[async_trait]
impl GatewayFilter for AddRequestParameter {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        let query = match exchange.request.query() {
            Some(q) if !q.is_empty() => format!("{}&{}", q, self.pair),
            _ => self.pair.clone(),
        };
        let path = exchange.request.path().to_string();
        exchange.request.set_path_and_query(&path, Some(&query))?;
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "AddRequestParameter"
    }
}

/// `AddRequestParameter=foo, bar`
#[derive(Debug, Default)]
pub struct AddRequestParameterGatewayFilterFactory;

impl ArgumentHints for AddRequestParameterGatewayFilterFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[NAME_KEY, VALUE_KEY]
    }
}

impl Factory for AddRequestParameterGatewayFilterFactory {
    fn name(&self) -> &str {
        "AddRequestParameter"
    }
}

impl GatewayFilterFactory for AddRequestParameterGatewayFilterFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        let pair = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(&args.string(NAME_KEY)?, &args.string(VALUE_KEY)?)
            .finish();
        Ok(Arc::new(AddRequestParameter { pair }))
    }
}

#[derive(Debug)]
struct PrefixPath {
    prefix: String,
}

#[async_trait]
impl GatewayFilter for PrefixPath {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        let path = format!("{}{}", self.prefix, exchange.request.path());
        set_path(exchange, &path)?;
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "PrefixPath"
    }
}

/// `PrefixPath=/api`
#[derive(Debug, Default)]
pub struct PrefixPathGatewayFilterFactory;

impl ArgumentHints for PrefixPathGatewayFilterFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[PREFIX_KEY]
    }
}

impl Factory for PrefixPathGatewayFilterFactory {
    fn name(&self) -> &str {
        "PrefixPath"
    }
}

impl GatewayFilterFactory for PrefixPathGatewayFilterFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        let prefix = args.string(PREFIX_KEY)?;
        if !prefix.starts_with('/') {
            return Err(GatewayError::invalid_argument(PREFIX_KEY, "must start with '/'"));
        }
        Ok(Arc::new(PrefixPath {
            prefix: prefix.trim_end_matches('/').to_string(),
        }))
    }
}

#[derive(Debug)]
struct SetPath {
    template: String,
}

#[async_trait]
impl GatewayFilter for SetPath {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        set_path(exchange, &self.template)?;
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "SetPath"
    }
}

/// `SetPath=/new/path`. The template is used literally.
#[derive(Debug, Default)]
pub struct SetPathGatewayFilterFactory;

impl ArgumentHints for SetPathGatewayFilterFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[TEMPLATE_KEY]
    }
}

impl Factory for SetPathGatewayFilterFactory {
    fn name(&self) -> &str {
        "SetPath"
    }
}

impl GatewayFilterFactory for SetPathGatewayFilterFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        let template = args.string(TEMPLATE_KEY)?;
        if !template.starts_with('/') {
            return Err(GatewayError::invalid_argument(TEMPLATE_KEY, "must start with '/'"));
        }
        Ok(Arc::new(SetPath { template }))
    }
}

#[derive(Debug)]
struct RewritePath {
    regexp: Regex,
    replacement: String,
}

#[async_trait]
impl GatewayFilter for RewritePath {
    async fn filter(&self, exchange: &mut ServerExchange, chain: GatewayFilterChain<'_>) -> GatewayResult<()> {
        let rewritten = self
            .regexp
            .replace_all(exchange.request.path(), self.replacement.as_str())
            .into_owned();
        let rewritten = if rewritten.starts_with('/') {
            rewritten
        } else {
            format!("/{}", rewritten)
        };
        set_path(exchange, &rewritten)?;
        chain.filter(exchange).await
    }

    fn name(&self) -> &str {
        "RewritePath"
    }
}

/// `RewritePath=/foo/(?<segment>.*), /${segment}`
///
/// `$\` in the replacement is read as `$`, for config formats that
/// interpret a bare `${...}`.
#[derive(Debug, Default)]
pub struct RewritePathGatewayFilterFactory;

impl ArgumentHints for RewritePathGatewayFilterFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[REGEXP_KEY, REPLACEMENT_KEY]
    }
}

impl Factory for RewritePathGatewayFilterFactory {
    fn name(&self) -> &str {
        "RewritePath"
    }
}

impl GatewayFilterFactory for RewritePathGatewayFilterFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedFilter> {
        let regexp = Regex::new(&args.string(REGEXP_KEY)?)
            .map_err(|e| GatewayError::invalid_argument(REGEXP_KEY, e))?;
        let replacement = args.string(REPLACEMENT_KEY)?.replace("$\\", "$");
        Ok(Arc::new(RewritePath {
            regexp,
            replacement,
        }))
    }
}

//! Method, Header, Query and Cookie predicates.

use std::sync::Arc;

use axum::http::Method;
use regex::Regex;

use super::{RoutePredicate, RoutePredicateFactory, SharedPredicate};
use crate::error::{GatewayError, GatewayResult};
use crate::factory::{ArgumentBundle, ArgumentHints, Factory};
use crate::http::ServerExchange;

const METHOD_KEY: &str = "method";
const HEADER_KEY: &str = "header";
const PARAM_KEY: &str = "param";
const NAME_KEY: &str = "name";
const REGEXP_KEY: &str = "regexp";

/// Compile a regex that must match the whole value.
pub(crate) fn full_match(arg: &str, pattern: &str) -> GatewayResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| GatewayError::invalid_argument(arg, e))
}

#[derive(Debug)]
struct MethodPredicate {
    method: Method,
}

impl RoutePredicate for MethodPredicate {
    fn test(&self, exchange: &ServerExchange) -> bool {
        exchange.request.method == self.method
    }
}

/// `Method=GET`
#[derive(Debug, Default)]
pub struct MethodRoutePredicateFactory;

impl ArgumentHints for MethodRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[METHOD_KEY]
    }
}

impl Factory for MethodRoutePredicateFactory {
    fn name(&self) -> &str {
        "Method"
    }
}

impl RoutePredicateFactory for MethodRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        let raw = args.string(METHOD_KEY)?;
        let method = Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
            .map_err(|e| GatewayError::invalid_argument(METHOD_KEY, e))?;
        Ok(Arc::new(MethodPredicate { method }))
    }
}

#[derive(Debug)]
struct HeaderPredicate {
    header: String,
    regexp: Regex,
}

impl RoutePredicate for HeaderPredicate {
    fn test(&self, exchange: &ServerExchange) -> bool {
        exchange
            .request
            .headers
            .get_all(self.header.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| self.regexp.is_match(v))
    }
}

/// `Header=X-Request-Id, \d+`
#[derive(Debug, Default)]
pub struct HeaderRoutePredicateFactory;

impl ArgumentHints for HeaderRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[HEADER_KEY, REGEXP_KEY]
    }
}

impl Factory for HeaderRoutePredicateFactory {
    fn name(&self) -> &str {
        "Header"
    }
}

impl RoutePredicateFactory for HeaderRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        Ok(Arc::new(HeaderPredicate {
            header: args.string(HEADER_KEY)?.to_ascii_lowercase(),
            regexp: full_match(REGEXP_KEY, &args.string(REGEXP_KEY)?)?,
        }))
    }
}

#[derive(Debug)]
struct QueryPredicate {
    param: String,
    regexp: Option<Regex>,
}

impl RoutePredicate for QueryPredicate {
    fn test(&self, exchange: &ServerExchange) -> bool {
        let params = exchange.request.query_params();
        let mut values = params
            .iter()
            .filter(|(k, _)| *k == self.param)
            .map(|(_, v)| v.as_str());

        match &self.regexp {
            None => values.next().is_some(),
            Some(regexp) => values.any(|v| regexp.is_match(v)),
        }
    }
}

/// `Query=baz` (presence) or `Query=foo, ba.` (value match)
#[derive(Debug, Default)]
pub struct QueryRoutePredicateFactory;

impl ArgumentHints for QueryRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[PARAM_KEY, REGEXP_KEY]
    }

    fn validate_args(&self) -> bool {
        false
    }
}

impl Factory for QueryRoutePredicateFactory {
    fn name(&self) -> &str {
        "Query"
    }
}

impl RoutePredicateFactory for QueryRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        args.validate_min(1, self.name())?;
        let regexp = match args.opt_string(REGEXP_KEY)? {
            Some(r) if !r.is_empty() => Some(full_match(REGEXP_KEY, &r)?),
            _ => None,
        };
        Ok(Arc::new(QueryPredicate {
            param: args.string(PARAM_KEY)?,
            regexp,
        }))
    }
}

#[derive(Debug)]
struct CookiePredicate {
    name: String,
    regexp: Regex,
}

impl RoutePredicate for CookiePredicate {
    fn test(&self, exchange: &ServerExchange) -> bool {
        exchange
            .request
            .cookies()
            .get(self.name.as_str())
            .is_some_and(|v| self.regexp.is_match(v))
    }
}

/// `Cookie=session, [a-f0-9]+`
#[derive(Debug, Default)]
pub struct CookieRoutePredicateFactory;

impl ArgumentHints for CookieRoutePredicateFactory {
    fn arg_names(&self) -> &[&'static str] {
        &[NAME_KEY, REGEXP_KEY]
    }
}

impl Factory for CookieRoutePredicateFactory {
    fn name(&self) -> &str {
        "Cookie"
    }
}

impl RoutePredicateFactory for CookieRoutePredicateFactory {
    fn apply(&self, args: &ArgumentBundle) -> GatewayResult<SharedPredicate> {
        Ok(Arc::new(CookiePredicate {
            name: args.string(NAME_KEY)?,
            regexp: full_match(REGEXP_KEY, &args.string(REGEXP_KEY)?)?,
        }))
    }
}

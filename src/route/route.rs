//! Compiled, immutable routes.

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::filter::OrderedFilter;
use crate::http::ServerExchange;
use crate::predicate::SharedPredicate;

/// Executable form of a route definition. Never mutated once built.
pub struct Route {
    id: String,
    uri: Url,
    order: i32,
    predicate: SharedPredicate,
    filters: Vec<OrderedFilter>,
}

impl Route {
    pub fn new(
        id: impl Into<String>,
        uri: Url,
        order: i32,
        predicate: SharedPredicate,
        filters: Vec<OrderedFilter>,
    ) -> Self {
        Self {
            id: id.into(),
            uri,
            order,
            predicate,
            filters,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn predicate(&self) -> &SharedPredicate {
        &self.predicate
    }

    /// Route-local filters, unsorted.
    pub fn filters(&self) -> &[OrderedFilter] {
        &self.filters
    }

    pub fn matches(&self, exchange: &ServerExchange) -> bool {
        self.predicate.test(exchange)
    }

    pub fn view(&self) -> RouteView {
        RouteView {
            route_id: self.id.clone(),
            uri: self.uri.to_string(),
            order: self.order,
            predicate: format!("{:?}", self.predicate),
            filters: self.filters.iter().map(|f| format!("{:?}", f)).collect(),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("uri", &self.uri.as_str())
            .field("order", &self.order)
            .field("predicate", &self.predicate)
            .field("filters", &self.filters)
            .finish()
    }
}

/// JSON shape of a compiled route for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    pub route_id: String,
    pub uri: String,
    pub order: i32,
    pub predicate: String,
    pub filters: Vec<String>,
}

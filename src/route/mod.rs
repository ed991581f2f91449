//! Route definitions, compilation and caching.
//!
//! # Data Flow
//! ```text
//! config routes + shorthands ─┐
//! repository.rs (admin CRUD) ─┼→ locator.rs (CompositeRouteDefinitionLocator)
//! discovery.rs (services)    ─┘
//!     → compiler.rs (factories + argument resolver → Route)
//!     → cache.rs (sorted snapshot, swapped atomically on refresh)
//!     → http/mapping.rs (first route whose predicate matches)
//! ```
//!
//! # Design Decisions
//! - A route that fails to compile is dropped, never fatal
//! - Readers see the old or the new snapshot, never a mix
//! - Definitions are plain data; compiled routes are immutable

pub mod cache;
pub mod compiler;
pub mod definition;
pub mod discovery;
pub mod locator;
pub mod repository;
#[allow(clippy::module_inception)]
mod route;

pub use cache::CachingRouteLocator;
pub use compiler::{RouteDefinitionRouteLocator, RouteLocator};
pub use definition::{FilterDefinition, PredicateDefinition, RouteDefinition};
pub use discovery::DiscoveryClientRouteDefinitionLocator;
pub use locator::{
    CompositeRouteDefinitionLocator, PropertiesRouteDefinitionLocator, RouteDefinitionLocator,
};
pub use repository::{InMemoryRouteDefinitionRepository, RouteDefinitionRepository};
pub use route::{Route, RouteView};

//! Route Gateway Library

pub mod admin;
pub mod config;
pub mod error;
pub mod factory;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod predicate;
pub mod ratelimit;
pub mod route;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::{GatewayContext, Shutdown};

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, catch-all handler)
//!     → request.rs (assign / propagate request ID)
//!     → exchange.rs (request + response under construction + attributes)
//!     → mapping.rs (first matching route)
//!     → filter::FilteringWebHandler (global + route filter chain)
//!     → response.rs (exchange or error → client response)
//!     → Send to client
//! ```

pub mod exchange;
pub mod mapping;
pub mod request;
pub mod response;
pub mod server;

pub use exchange::{ExchangeAttributes, GatewayRequest, GatewayResponse, ServerExchange};
pub use mapping::RoutePredicateHandlerMapping;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};

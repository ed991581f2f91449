//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → [gateway] table shared via Arc<ArcSwap<GatewayProperties>>
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of GatewayProperties + discovery catalog
//!     → route cache refresh
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the route engine tables reload; listener and admin addresses
//!   need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, DiscoveryConfig, GatewayConfig, GatewayProperties, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimiterConfig, TimeoutConfig,
};
pub use watcher::ConfigWatcher;

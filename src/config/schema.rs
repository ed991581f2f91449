//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::route::{FilterDefinition, RouteDefinition};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Administrative API settings.
    pub admin: AdminConfig,

    /// Route definitions and defaults for the route engine.
    pub gateway: GatewayProperties,

    /// Defaults exposed to route arguments and the sweeper interval.
    pub rate_limiter: RateLimiterConfig,

    /// Static service catalog for `lb://` targets.
    pub discovery: DiscoveryConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum inbound request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time to wait for the upstream response head, in seconds.
    pub response_secs: u64,

    /// Total time for one inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            response_secs: 30,
            request_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// The `[gateway]` table: everything the route engine reads at refresh time.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayProperties {
    /// Filters prepended to every route's own filters.
    pub default_filters: Vec<FilterDefinition>,

    pub routes: Vec<RouteDefinition>,

    /// Routes in `id=uri,Predicate=..,Filter=..` form.
    pub route_shorthands: Vec<String>,

    /// Header the transport trusts as the authenticated principal name.
    pub principal_header: Option<String>,
}

impl Default for GatewayProperties {
    fn default() -> Self {
        Self {
            default_filters: vec![FilterDefinition::new("RemoveNonProxyHeaders")],
            routes: Vec::new(),
            route_shorthands: Vec::new(),
            principal_header: None,
        }
    }
}

/// Rate limiter defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Exposed to route arguments as `@defaultReplenishRate`.
    pub default_replenish_rate: u32,

    /// Exposed to route arguments as `@defaultBurstCapacity`.
    pub default_burst_capacity: u32,

    /// How often full buckets are dropped from memory.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            default_replenish_rate: 10,
            default_burst_capacity: 20,
            sweep_interval_secs: 60,
        }
    }
}

/// Static service discovery.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Generate one route per discovered service.
    pub enabled: bool,

    /// Prefix for generated route ids.
    pub route_id_prefix: String,

    /// Service name to `host:port` instances.
    pub services: IndexMap<String, Vec<String>>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            route_id_prefix: "discovery_".to_string(),
            services: IndexMap::new(),
        }
    }
}

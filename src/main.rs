//! Route Gateway
//!
//! An API gateway built with Tokio and Axum: declarative routes are compiled
//! into predicate and filter pipelines, matched per request, and forwarded
//! upstream.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────────────────┐
//!                      │                        GATEWAY                             │
//!                      │                                                            │
//!   Client Request     │  ┌─────────┐   ┌──────────────┐   ┌──────────────────────┐ │
//!   ───────────────────┼─▶│  http   │──▶│   mapping    │──▶│ FilteringWebHandler  │ │
//!                      │  │ server  │   │ (first match)│   │ global + route chain │ │
//!                      │  └─────────┘   └──────┬───────┘   └──────────┬───────────┘ │
//!                      │                       │ snapshot             │             │
//!                      │                ┌──────┴───────┐   ┌──────────▼───────────┐ │
//!                      │                │ route cache  │   │ lb:// → instance     │ │
//!                      │                └──────▲───────┘   │ HttpRouting filter   │─┼──▶ Upstream
//!                      │                       │ refresh   └──────────────────────┘ │
//!                      │  ┌────────────────────┴─────────────────────────────────┐  │
//!                      │  │ compiler: definitions + factories + argument resolver│  │
//!                      │  └────────────────────▲─────────────────────────────────┘  │
//!                      │       config / shorthands │ admin repository │ discovery   │
//!                      │                                                            │
//!                      │  Cross-cutting: config reload, observability, lifecycle   │
//!                      └────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use route_gateway::config::{load_config, GatewayConfig};
use route_gateway::lifecycle::{startup, StartupError};
use route_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "route-gateway", version, about = "API gateway route engine")]
struct Args {
    /// TOML configuration file; watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path).map_err(StartupError::from)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "route-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.gateway.routes.len(),
        shorthands = config.gateway.route_shorthands.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config, args.config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

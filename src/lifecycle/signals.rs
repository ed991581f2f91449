//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP refreshes routes, not shutdown

use std::sync::Arc;

use super::Shutdown;
use crate::route::CachingRouteLocator;

/// Listen until a termination signal, refreshing routes on SIGHUP.
pub async fn listen(shutdown: Shutdown, routes: Arc<CachingRouteLocator>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut term, mut hup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(term), Ok(hup)) => (term, hup),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
                wait_ctrl_c().await;
                shutdown.trigger();
                return;
            }
        };

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = term.recv() => break,
                _ = hup.recv() => {
                    tracing::info!("SIGHUP received, refreshing routes");
                    if let Err(e) = routes.refresh().await {
                        tracing::error!(error = %e, "Route refresh failed");
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = &routes;
        wait_ctrl_c().await;
    }

    tracing::info!("Termination signal received");
    shutdown.trigger();
}

async fn wait_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

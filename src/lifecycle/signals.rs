//! OS signal handling.
//!
//! # Responsibilities
//! - SIGTERM / SIGINT trigger graceful shutdown
//! - SIGHUP forces a config reload, not shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A failed SIGHUP reload is logged; the relay keeps serving

use std::sync::Arc;

use crate::lifecycle::Shutdown;
use crate::reload::ReloadManager;

/// Wait for signals until a shutdown signal arrives, then trigger `shutdown`.
pub async fn handle_signals(shutdown: Arc<Shutdown>, reload: Arc<ReloadManager>) {
    wait_for_shutdown(&reload).await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

#[cfg(unix)]
async fn wait_for_shutdown(reload: &Arc<ReloadManager>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut term, mut hup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
        (Ok(term), Ok(hup)) => (term, hup),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return,
            _ = term.recv() => return,
            _ = hup.recv() => {
                tracing::info!("SIGHUP received, reloading config");
                if let Err(e) = reload.reload_async(true).await {
                    tracing::error!(error = %e, "SIGHUP reload failed");
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_reload: &Arc<ReloadManager>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
}

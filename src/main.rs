//! Alert relay
//!
//! Receives Alertmanager webhooks and forwards them to chat-robot endpoints.
//!
//! # Architecture Overview
//!
//! ```text
//!     Alertmanager           ┌──────────────────────────────────────────────┐
//!     ───────────────────────┼─▶ http ──▶ routing ──▶ template ──▶ outbound ─┼──▶ Robot
//!                            │     │                                         │   webhook
//!                            │     ▼                                         │
//!                            │  RuntimeStore ◀── reload (poll / SIGHUP /     │
//!                            │  (snapshot)        POST /-/reload)            │
//!                            │                                               │
//!                            │  admin API · lifecycle · observability        │
//!                            └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use alert_relay::http::{AppState, HttpServer};
use alert_relay::lifecycle::{self, Shutdown};
use alert_relay::observability::{self, LogFormat};
use alert_relay::runtime::RuntimeSnapshot;

#[derive(Parser)]
#[command(name = "alert-relay", version, about = "Alertmanager to chat-robot relay")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Validate the config and templates, then exit
    #[arg(long)]
    check: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    observability::init_logging(args.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "alert-relay starting");

    if args.check {
        let snapshot = RuntimeSnapshot::load_from_file(&args.config)?;
        tracing::info!(
            config = %args.config.display(),
            groups = ?snapshot.group_names(),
            templates = ?snapshot.renderer.template_names(),
            "Configuration OK"
        );
        return Ok(());
    }

    let services = lifecycle::initialize(&args.config)?;
    let snapshot = services.store.load();

    if snapshot.config.metrics.enabled {
        match snapshot.config.metrics.address.parse::<SocketAddr>() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %snapshot.config.metrics.address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&snapshot.config.server.listen).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        path = %snapshot.config.server.path,
        admin = snapshot.config.admin.enabled,
        reload = snapshot.config.reload.enabled,
        "Listening for alerts"
    );
    drop(snapshot);

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let poller = tokio::spawn(Arc::clone(&services.reload).run(shutdown.subscribe()));
    tokio::spawn(lifecycle::handle_signals(Arc::clone(&shutdown), Arc::clone(&services.reload)));

    let server = HttpServer::new(AppState::new(services.store, services.reload));
    server.run(listener, server_shutdown).await?;

    // The server may stop on its own; make sure the poller follows.
    shutdown.trigger();
    let _ = poller.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

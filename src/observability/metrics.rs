//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_alerts_total` (counter): webhook payloads handled, by result
//! - `relay_send_total` (counter): deliveries, by target and result
//! - `relay_reload_total` (counter): reload attempts, by result
//! - `relay_config_loaded_timestamp_seconds` (gauge): load time of the served snapshot
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and serves its own listener

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
///
/// Failure is logged and leaves metrics disabled; it never stops the relay.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_alert(result: &'static str) {
    counter!("relay_alerts_total", "result" => result).increment(1);
}

pub fn record_send(target: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    counter!("relay_send_total", "target" => target.to_string(), "result" => result).increment(1);
}

pub fn record_reload(result: &'static str) {
    counter!("relay_reload_total", "result" => result).increment(1);
}

pub fn record_snapshot_loaded(loaded_at: chrono::DateTime<chrono::Utc>) {
    gauge!("relay_config_loaded_timestamp_seconds").set(loaded_at.timestamp() as f64);
}

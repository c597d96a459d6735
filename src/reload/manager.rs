//! Snapshot reload coordination.
//!
//! # Responsibilities
//! - Rebuild the snapshot when watched files change, or on demand
//! - Swap the store only after a complete, successful build
//! - Keep status readable while a rebuild is running
//!
//! # Design Decisions
//! - Reloads serialize on `reload_lock`; bookkeeping lives behind its own lock
//! - File I/O is synchronous; async callers go through `spawn_blocking`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::observability::metrics;
use crate::reload::fingerprint::{fingerprint, Fingerprint, FingerprintError};
use crate::runtime::{BuildError, RuntimeSnapshot, RuntimeStore};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("config path is empty")]
    EmptyPath,

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("reload task failed: {0}")]
    Task(String),
}

/// Result of a reload attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Unchanged,
    Reloaded,
}

/// Reload bookkeeping as reported to operators.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadStatus {
    pub enabled: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: String,
    pub last_error_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct ReloadState {
    last_fingerprint: Option<Fingerprint>,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
}

/// Owns the only write path into the [`RuntimeStore`] after startup.
#[derive(Debug)]
pub struct ReloadManager {
    config_path: PathBuf,
    store: Arc<RuntimeStore>,
    enabled: bool,
    interval: Duration,
    reload_lock: Mutex<()>,
    state: RwLock<ReloadState>,
}

impl ReloadManager {
    /// Create a manager for the snapshot currently in `store`.
    ///
    /// The initial fingerprint is recorded best effort; if it cannot be taken
    /// the first check simply rebuilds.
    pub fn new(
        config_path: impl Into<PathBuf>,
        store: Arc<RuntimeStore>,
        enabled: bool,
        interval: Duration,
    ) -> Result<Self, ReloadError> {
        let config_path = config_path.into();
        if config_path.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(ReloadError::EmptyPath);
        }
        let interval = if interval.is_zero() { DEFAULT_INTERVAL } else { interval };

        let manager = Self {
            config_path,
            store,
            enabled,
            interval,
            reload_lock: Mutex::new(()),
            state: RwLock::new(ReloadState::default()),
        };
        match manager.current_fingerprint() {
            Ok(fp) => manager.state.write().last_fingerprint = Some(fp),
            Err(e) => tracing::warn!(error = %e, "Initial fingerprint unavailable"),
        }
        Ok(manager)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn store(&self) -> &Arc<RuntimeStore> {
        &self.store
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> ReloadStatus {
        let state = self.state.read();
        ReloadStatus {
            enabled: self.enabled,
            last_success: state.last_success,
            last_error: state.last_error.clone().unwrap_or_default(),
            last_error_at: state.last_error_at,
        }
    }

    /// Rebuild only if the watched files changed since the last success.
    ///
    /// A fingerprint failure is recorded like a failed rebuild.
    pub fn reload_if_changed(&self) -> Result<ReloadOutcome, ReloadError> {
        let current = match self.current_fingerprint() {
            Ok(fp) => fp,
            Err(e) => {
                let err = ReloadError::from(e);
                self.record_failure(&err, false);
                return Err(err);
            }
        };
        if self.state.read().last_fingerprint.as_ref() == Some(&current) {
            return Ok(ReloadOutcome::Unchanged);
        }
        self.reload(false)
    }

    /// Rebuild and swap. Without `force`, unchanged files are a no-op.
    ///
    /// On failure the served snapshot is left untouched and the error is
    /// recorded for [`status`](Self::status).
    pub fn reload(&self, force: bool) -> Result<ReloadOutcome, ReloadError> {
        let _guard = self.reload_lock.lock();

        let result = self.rebuild(force);
        match &result {
            Ok(ReloadOutcome::Unchanged) => metrics::record_reload("unchanged"),
            Ok(ReloadOutcome::Reloaded) => {
                metrics::record_reload("ok");
                tracing::info!(config = %self.config_path.display(), force, "Reload succeeded");
            }
            Err(e) => self.record_failure(e, force),
        }
        result
    }

    fn record_failure(&self, err: &ReloadError, force: bool) {
        metrics::record_reload("error");
        tracing::error!(config = %self.config_path.display(), force, error = %err, "Reload failed");
        let mut state = self.state.write();
        state.last_error = Some(err.to_string());
        state.last_error_at = Some(Utc::now());
    }

    /// [`reload`](Self::reload) on the blocking pool.
    pub async fn reload_async(self: &Arc<Self>, force: bool) -> Result<ReloadOutcome, ReloadError> {
        let manager = Arc::clone(self);
        tokio::task::spawn_blocking(move || manager.reload(force))
            .await
            .map_err(|e| ReloadError::Task(e.to_string()))?
    }

    /// Poll for changes every `interval` until shutdown. Returns at once when
    /// polling is disabled.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.enabled {
            tracing::info!("Config polling disabled");
            return;
        }

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Config poller starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the startup snapshot is fresh.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let manager = Arc::clone(&self);
                    match tokio::task::spawn_blocking(move || manager.reload_if_changed()).await {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::debug!(error = %e, "Config check failed"),
                        Err(e) => tracing::error!(error = %e, "Config check task failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Config poller received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn rebuild(&self, force: bool) -> Result<ReloadOutcome, ReloadError> {
        let current = self.current_fingerprint()?;
        if !force && self.state.read().last_fingerprint.as_ref() == Some(&current) {
            return Ok(ReloadOutcome::Unchanged);
        }

        let next = RuntimeSnapshot::load_from_file(&self.config_path)?;
        let next_fp = fingerprint(&self.config_path, template_dir(&next))?;
        metrics::record_snapshot_loaded(next.loaded_at);
        self.store.store(next);

        let mut state = self.state.write();
        state.last_fingerprint = Some(next_fp);
        state.last_success = Some(Utc::now());
        state.last_error = None;
        state.last_error_at = None;
        Ok(ReloadOutcome::Reloaded)
    }

    /// Fingerprint using the template directory of the served snapshot.
    fn current_fingerprint(&self) -> Result<Fingerprint, FingerprintError> {
        let snapshot = self.store.load();
        fingerprint(&self.config_path, template_dir(&snapshot))
    }
}

fn template_dir(snapshot: &RuntimeSnapshot) -> Option<&Path> {
    snapshot.config.template.dir().map(Path::new)
}

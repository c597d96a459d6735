//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration into the first snapshot
//! - Create the store and the reload manager around it
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;

use crate::observability::metrics;
use crate::reload::{ReloadError, ReloadManager};
use crate::runtime::{BuildError, RuntimeSnapshot, RuntimeStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("load config: {0}")]
    Build(#[from] BuildError),

    #[error("init reload: {0}")]
    Reload(#[from] ReloadError),
}

/// Long-lived services shared by the server, the poller and signal handling.
#[derive(Debug, Clone)]
pub struct Services {
    pub store: Arc<RuntimeStore>,
    pub reload: Arc<ReloadManager>,
}

/// Build the initial snapshot and the services around it.
pub fn initialize(config_path: &Path) -> Result<Services, StartupError> {
    let snapshot = RuntimeSnapshot::load_from_file(config_path)?;
    let reload_enabled = snapshot.config.reload.enabled;
    let interval = snapshot.config.reload.interval();

    tracing::info!(
        config = %config_path.display(),
        groups = snapshot.groups.len(),
        routes = snapshot.routes.len(),
        templates = snapshot.renderer.template_names().len(),
        "Configuration loaded"
    );
    metrics::record_snapshot_loaded(snapshot.loaded_at);

    let store = Arc::new(RuntimeStore::new(snapshot));
    let reload = ReloadManager::new(config_path, Arc::clone(&store), reload_enabled, interval)?;

    Ok(Services {
        store,
        reload: Arc::new(reload),
    })
}

//! Hot reload of configuration and templates.
//!
//! # Data Flow
//! ```text
//! Poll tick / POST /-/reload / SIGHUP
//!     → fingerprint.rs (config + template dir metadata)
//!     → unchanged and not forced → no-op
//!     → RuntimeSnapshot::load_from_file (load, validate, compile)
//!     → RuntimeStore::store (atomic swap) on success only
//! ```
//!
//! # Design Decisions
//! - Polling over file notifications; metadata only, contents never read
//! - A failed reload keeps serving the previous snapshot

pub mod fingerprint;
pub mod manager;

pub use fingerprint::{fingerprint, Fingerprint, FingerprintError};
pub use manager::{ReloadError, ReloadManager, ReloadOutcome, ReloadStatus};

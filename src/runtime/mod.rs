//! Runtime state served to request handlers.
//!
//! # Data Flow
//! ```text
//! Config (validated)
//!     → Renderer::new (templates)
//!     → compile_groups (targets, template binding, mention rules)
//!     → compile_routes
//!     → RuntimeSnapshot (immutable)
//!     → RuntimeStore (atomic swap)
//!
//! Request path:
//!     RuntimeStore::load → dispatch(snapshot, payload)
//! ```
//!
//! # Design Decisions
//! - A snapshot is never mutated; reloads build a new one and swap it in
//! - A request keeps the snapshot it loaded until it completes

pub mod dispatch;
pub mod group;
pub mod snapshot;
pub mod store;

pub use dispatch::{dispatch, send_to_group, DispatchError};
pub use group::{compile_groups, Group};
pub use snapshot::RuntimeSnapshot;
pub use store::RuntimeStore;

use crate::config::ConfigError;
use crate::outbound::SendError;
use crate::template::TemplateError;

/// Errors raised while assembling a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("init messaging client: {0}")]
    Client(#[from] SendError),

    #[error("group name is empty")]
    GroupNameEmpty,

    #[error("group {group:?} has invalid template name {template:?}")]
    InvalidTemplateName { group: String, template: String },

    #[error("group {group:?} references unknown target {target:?}")]
    UnknownTarget { group: String, target: String },

    #[error("group {group:?} references unknown template {template:?}")]
    UnknownTemplate { group: String, template: String },

    #[error("default group is required")]
    DefaultGroupMissing,
}

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read, parse, apply defaults)
//!     → validation.rs (semantic checks, first violation wins)
//!     → Config (validated, immutable)
//!     → compiled into a RuntimeSnapshot (see runtime/)
//!
//! On reload:
//!     reload/ detects a fingerprint change
//!     → loader.rs loads the new config
//!     → validation.rs validates
//!     → full snapshot rebuild, then atomic swap
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Credentials are wrapped in [`Secret`] so they never leak through logs

pub mod loader;
pub mod schema;
pub mod secret;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AuthConfig, BasicAuthConfig, Config, GroupConfig, MentionConfig,
    MentionRuleConfig, MessageKind, MessagingConfig, MetricsConfig, ReloadConfig, RouteConfig,
    ServerConfig, TargetConfig, TemplateConfig, WhenConfig,
};
pub use secret::Secret;
pub use validation::{valid_template_name, ValidationError};

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::config::secret::Secret;

const DEFAULT_ADMIN_PREFIX: &str = "/admin";

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Alert listener settings.
    pub server: ServerConfig,

    /// Token expected on the alert endpoint.
    pub auth: AuthConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Hot reload polling.
    pub reload: ReloadConfig,

    /// Template directory.
    pub template: TemplateConfig,

    /// Prometheus exporter.
    pub metrics: MetricsConfig,

    /// Targets, groups and routes.
    pub messaging: MessagingConfig,
}

/// Alert listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub listen: String,

    /// Path receiving Alertmanager webhooks.
    pub path: String,

    pub read_timeout_secs: u64,

    /// Upper bound on handling one request, delivery included.
    pub write_timeout_secs: u64,

    pub idle_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            path: "/alert".to_string(),
            read_timeout_secs: 5,
            write_timeout_secs: 10,
            idle_timeout_secs: 60,
            max_body_bytes: 4 * 1024 * 1024, // 4MB
        }
    }
}

/// Alert endpoint authentication.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer / X-Token value. Blank disables the check.
    pub token: Secret,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// Mount point of the admin API.
    pub path_prefix: String,

    pub basic_auth: BasicAuthConfig,
}

impl AdminConfig {
    /// Mount point for the admin router. Nesting needs a non-root path, so
    /// a blank or root prefix falls back to `/admin`.
    pub fn mount_path(&self) -> String {
        let trimmed = self.path_prefix.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return DEFAULT_ADMIN_PREFIX.to_string();
        }
        if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path_prefix: DEFAULT_ADMIN_PREFIX.to_string(),
            basic_auth: BasicAuthConfig::default(),
        }
    }
}

/// HTTP Basic credentials for the admin API.
///
/// Exactly one of `password` or `password_sha256` is set. The hashed form is
/// `hex(sha256(salt || password))` with a base64 encoded salt.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: Secret,
    pub password_sha256: Secret,
    pub salt: Secret,
}

/// Hot reload polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Poll the config file and template directory for changes.
    pub enabled: bool,

    /// Polling interval in milliseconds.
    pub interval_ms: u64,
}

impl ReloadConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 2000,
        }
    }
}

/// Template directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory of `*.tmpl` files. Relative paths are resolved against the
    /// config file's directory at load time.
    pub dir: Option<String>,
}

impl TemplateConfig {
    /// The configured directory, if non-blank.
    pub fn dir(&self) -> Option<&str> {
        self.dir
            .as_deref()
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Outbound messaging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Per-delivery HTTP timeout in seconds.
    pub timeout_secs: u64,

    pub targets: Vec<TargetConfig>,

    pub groups: Vec<GroupConfig>,

    /// Ordered routes, first match wins.
    pub routes: Vec<RouteConfig>,
}

impl MessagingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            targets: Vec::new(),
            groups: Vec::new(),
            routes: Vec::new(),
        }
    }
}

/// Message format accepted by a target.
///
/// A blank value selects markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Markdown,
    Text,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Markdown => "markdown",
            MessageKind::Text => "text",
        }
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim() {
            "" | "markdown" => Ok(MessageKind::Markdown),
            "text" => Ok(MessageKind::Text),
            other => Err(de::Error::unknown_variant(other, &["markdown", "text"])),
        }
    }
}

/// A named outbound endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TargetConfig {
    /// Unique target identifier.
    pub name: String,

    /// Robot webhook URL (http or https).
    pub webhook: Secret,

    /// Optional signing secret.
    #[serde(default)]
    pub secret: Secret,

    #[serde(default)]
    pub msg_type: MessageKind,

    /// Fixed markdown title. Derived from the payload when absent.
    #[serde(default)]
    pub title: Option<String>,
}

/// Allow-lists over the dimensions of an alert payload.
///
/// Dimensions are AND-combined, values within a dimension OR-combined, and an
/// empty dimension matches everything.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WhenConfig {
    pub receiver: Vec<String>,
    pub status: Vec<String>,
    pub labels: BTreeMap<String, Vec<String>>,
}

/// Who to draw attention to in a rendered message.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MentionConfig {
    pub at_all: bool,
    pub at_mobiles: Vec<String>,
    pub at_user_ids: Vec<String>,
}

/// A conditional mention override inside a group.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MentionRuleConfig {
    pub name: String,
    pub when: WhenConfig,
    pub mention: MentionConfig,
}

/// Binding of targets to a template and a mention policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GroupConfig {
    /// Unique group identifier. `default` is required.
    pub name: String,

    /// Target names notified by this group.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Template name, `default` when blank.
    #[serde(default)]
    pub template: String,

    #[serde(default)]
    pub mention: MentionConfig,

    /// Ordered overrides, merged cumulatively.
    #[serde(default)]
    pub mention_rules: Vec<MentionRuleConfig>,
}

/// Route selecting which groups receive a matching payload.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    #[serde(default)]
    pub when: WhenConfig,

    /// Groups notified on match.
    #[serde(default)]
    pub groups: Vec<String>,
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (groups reference targets, routes reference groups)
//! - Validate target webhooks and admin credentials
//! - Normalize path prefixes
//!
//! # Design Decisions
//! - Returns the first violation, not all of them
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::sync::LazyLock;

use base64::Engine as _;
use regex::Regex;
use url::Url;

use crate::config::schema::Config;

static TEMPLATE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]{0,127}$").expect("template name pattern is valid")
});

/// True when `name` is usable as a template name (and file stem).
pub fn valid_template_name(name: &str) -> bool {
    TEMPLATE_NAME.is_match(name)
}

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.path {0:?} collides with a built-in route")]
    ReservedPath(String),

    #[error("admin.basic_auth.username must not be empty")]
    AdminUsernameMissing,

    #[error("admin.basic_auth.password or admin.basic_auth.password_sha256 is required")]
    AdminPasswordMissing,

    #[error("admin.basic_auth.password and admin.basic_auth.password_sha256 are mutually exclusive")]
    AdminPasswordConflict,

    #[error("admin.basic_auth.password_sha256 must be 64 hex chars")]
    AdminHashLength,

    #[error("admin.basic_auth.password_sha256 must be hex: {0}")]
    AdminHashNotHex(String),

    #[error("admin.basic_auth.salt is required when password_sha256 is set")]
    AdminSaltMissing,

    #[error("admin.basic_auth.salt must be base64: {0}")]
    AdminSaltNotBase64(String),

    #[error("messaging.targets must not be empty")]
    NoTargets,

    #[error("messaging.targets[].name must not be empty")]
    TargetNameEmpty,

    #[error("messaging.targets has duplicate name {0:?}")]
    DuplicateTarget(String),

    #[error("messaging.targets[{0}].webhook must not be empty")]
    WebhookEmpty(String),

    #[error("messaging.targets[{target}].webhook must be a valid url: {reason}")]
    WebhookInvalid { target: String, reason: String },

    #[error("messaging.targets[{0}].webhook scheme must be http or https")]
    WebhookScheme(String),

    #[error("messaging.targets[{0}].webhook host must not be empty")]
    WebhookHost(String),

    #[error("messaging.groups must not be empty (must include name \"default\")")]
    NoGroups,

    #[error("messaging.groups[].name must not be empty")]
    GroupNameEmpty,

    #[error("messaging.groups has duplicate name {0:?}")]
    DuplicateGroup(String),

    #[error("messaging.groups[{0}].targets must not be empty")]
    GroupWithoutTargets(String),

    #[error("messaging.groups[{group}] references unknown target {target:?}")]
    UnknownTarget { group: String, target: String },

    #[error("messaging.groups.default is required")]
    DefaultGroupMissing,

    #[error("messaging.routes[].name must not be empty")]
    RouteNameEmpty,

    #[error("messaging.routes[{0}].groups must not be empty")]
    RouteWithoutGroups(String),

    #[error("messaging.routes[{route}] references unknown group {group:?}")]
    UnknownGroup { route: String, group: String },
}

/// Validate the configuration, normalizing paths in place.
pub fn validate_config(config: &mut Config) -> Result<(), ValidationError> {
    if !config.server.path.starts_with('/') {
        config.server.path = format!("/{}", config.server.path);
    }
    if !config.admin.path_prefix.is_empty() && !config.admin.path_prefix.starts_with('/') {
        config.admin.path_prefix = format!("/{}", config.admin.path_prefix);
    }

    validate_server_path(config)?;
    if config.admin.enabled {
        validate_admin(config)?;
    }

    let target_names = validate_targets(config)?;
    let group_names = validate_groups(config, &target_names)?;
    validate_routes(config, &group_names)
}

/// Paths served by the relay itself, besides the admin mount.
const RESERVED_PATHS: [&str; 3] = ["/healthz", "/readyz", "/-/reload"];

fn validate_server_path(config: &Config) -> Result<(), ValidationError> {
    let path = config.server.path.trim_end_matches('/');
    let admin = config.admin.mount_path();
    let under_admin = path == admin || path.starts_with(&format!("{admin}/"));
    if under_admin || RESERVED_PATHS.contains(&path) {
        return Err(ValidationError::ReservedPath(config.server.path.clone()));
    }
    Ok(())
}

fn validate_admin(config: &Config) -> Result<(), ValidationError> {
    let auth = &config.admin.basic_auth;
    if auth.username.trim().is_empty() {
        return Err(ValidationError::AdminUsernameMissing);
    }
    match (auth.password.is_blank(), auth.password_sha256.is_blank()) {
        (true, true) => return Err(ValidationError::AdminPasswordMissing),
        (false, false) => return Err(ValidationError::AdminPasswordConflict),
        _ => {}
    }
    if auth.password_sha256.is_blank() {
        return Ok(());
    }

    let hash = auth.password_sha256.expose().trim();
    if hash.len() != 64 {
        return Err(ValidationError::AdminHashLength);
    }
    hex::decode(hash).map_err(|e| ValidationError::AdminHashNotHex(e.to_string()))?;

    if auth.salt.is_blank() {
        return Err(ValidationError::AdminSaltMissing);
    }
    base64::engine::general_purpose::STANDARD
        .decode(auth.salt.expose().trim())
        .map_err(|e| ValidationError::AdminSaltNotBase64(e.to_string()))?;
    Ok(())
}

fn validate_targets(config: &Config) -> Result<HashSet<String>, ValidationError> {
    let targets = &config.messaging.targets;
    if targets.is_empty() {
        return Err(ValidationError::NoTargets);
    }

    let mut names = HashSet::with_capacity(targets.len());
    for target in targets {
        let name = target.name.trim();
        if name.is_empty() {
            return Err(ValidationError::TargetNameEmpty);
        }
        if !names.insert(name.to_string()) {
            return Err(ValidationError::DuplicateTarget(name.to_string()));
        }
        validate_webhook(name, target.webhook.expose())?;
    }
    Ok(names)
}

fn validate_webhook(target: &str, webhook: &str) -> Result<(), ValidationError> {
    let webhook = webhook.trim();
    if webhook.is_empty() {
        return Err(ValidationError::WebhookEmpty(target.to_string()));
    }
    let url = Url::parse(webhook).map_err(|e| ValidationError::WebhookInvalid {
        target: target.to_string(),
        reason: e.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ValidationError::WebhookScheme(target.to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::WebhookHost(target.to_string()));
    }
    Ok(())
}

fn validate_groups(
    config: &Config,
    target_names: &HashSet<String>,
) -> Result<HashSet<String>, ValidationError> {
    let groups = &config.messaging.groups;
    if groups.is_empty() {
        return Err(ValidationError::NoGroups);
    }

    let mut names = HashSet::with_capacity(groups.len());
    for group in groups {
        let name = group.name.trim();
        if name.is_empty() {
            return Err(ValidationError::GroupNameEmpty);
        }
        if !names.insert(name.to_string()) {
            return Err(ValidationError::DuplicateGroup(name.to_string()));
        }
        if group.targets.is_empty() {
            return Err(ValidationError::GroupWithoutTargets(name.to_string()));
        }
        if let Some(unknown) = group.targets.iter().find(|t| !target_names.contains(t.as_str())) {
            return Err(ValidationError::UnknownTarget {
                group: name.to_string(),
                target: unknown.clone(),
            });
        }
    }

    if !names.contains("default") {
        return Err(ValidationError::DefaultGroupMissing);
    }
    Ok(names)
}

fn validate_routes(config: &Config, group_names: &HashSet<String>) -> Result<(), ValidationError> {
    for route in &config.messaging.routes {
        let name = route.name.trim();
        if name.is_empty() {
            return Err(ValidationError::RouteNameEmpty);
        }
        if route.groups.is_empty() {
            return Err(ValidationError::RouteWithoutGroups(name.to_string()));
        }
        if let Some(unknown) = route.groups.iter().find(|g| !group_names.contains(g.as_str())) {
            return Err(ValidationError::UnknownGroup {
                route: name.to_string(),
                group: unknown.clone(),
            });
        }
    }
    Ok(())
}

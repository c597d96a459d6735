//! Immutable runtime snapshot.
//!
//! # Responsibilities
//! - Assemble a validated config, compiled templates, groups and routes
//! - Enforce that every group's template exists in the compiled set
//! - Own the outbound client configured for this snapshot

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::{load_config, Config, TargetConfig};
use crate::outbound::MessagingClient;
use crate::routing::{compile_routes, Route, DEFAULT_GROUP};
use crate::runtime::group::{compile_groups, targets_by_name, Group};
use crate::runtime::BuildError;
use crate::template::Renderer;

/// Everything a request needs, built once and never mutated.
#[derive(Debug)]
pub struct RuntimeSnapshot {
    pub config_path: PathBuf,
    pub base_dir: PathBuf,
    pub config: Config,
    pub renderer: Renderer,
    pub client: MessagingClient,
    pub targets: HashMap<String, TargetConfig>,
    pub groups: HashMap<String, Group>,
    pub routes: Vec<Route>,
    pub loaded_at: DateTime<Utc>,
}

impl RuntimeSnapshot {
    /// Load, validate and compile the configuration at `config_path`.
    pub fn load_from_file(config_path: &Path) -> Result<Self, BuildError> {
        let config = load_config(config_path)?;
        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::build(config_path.to_path_buf(), base_dir, config)
    }

    /// Compile an already validated config.
    pub fn build(config_path: PathBuf, base_dir: PathBuf, config: Config) -> Result<Self, BuildError> {
        let renderer = Renderer::new(&config.template)?;
        let client = MessagingClient::new(config.messaging.timeout())?;
        let targets = targets_by_name(&config);
        let groups = compile_groups(&config, &targets)?;

        for group in groups.values() {
            if !renderer.has_template(&group.template) {
                return Err(BuildError::UnknownTemplate {
                    group: group.name.clone(),
                    template: group.template.clone(),
                });
            }
        }
        if !groups.contains_key(DEFAULT_GROUP) {
            return Err(BuildError::DefaultGroupMissing);
        }

        let routes = compile_routes(&config);

        tracing::debug!(
            config = %config_path.display(),
            targets = targets.len(),
            groups = groups.len(),
            routes = routes.len(),
            "Runtime snapshot built"
        );

        Ok(Self {
            config_path,
            base_dir,
            config,
            renderer,
            client,
            targets,
            groups,
            routes,
            loaded_at: Utc::now(),
        })
    }

    /// Group names, sorted.
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG: &str = r#"
[auth]
token = "a"

[template]
dir = "templates"

[[messaging.targets]]
name = "ops"
webhook = "https://robot.example/send?access_token=x"

[[messaging.groups]]
name = "default"
targets = ["ops"]
template = "ops"
"#;

    #[test]
    fn test_load_from_file_with_directory_template() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("templates")).unwrap();
        fs::write(dir.path().join("templates/ops.tmpl"), "{{ payload.status }}").unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, CONFIG).unwrap();

        let snapshot = RuntimeSnapshot::load_from_file(&path).unwrap();
        assert_eq!(snapshot.config_path, path);
        assert_eq!(snapshot.base_dir, dir.path());
        assert_eq!(snapshot.group_names(), vec!["default".to_string()]);
        assert_eq!(snapshot.groups["default"].template, "ops");
        assert!(snapshot.targets.contains_key("ops"));
    }

    #[test]
    fn test_group_template_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, CONFIG).unwrap();

        let err = RuntimeSnapshot::load_from_file(&path).unwrap_err();
        assert!(
            matches!(&err, BuildError::UnknownTemplate { group, template } if group == "default" && template == "ops"),
            "{err}"
        );
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuntimeSnapshot::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }
}

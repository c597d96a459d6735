//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config path is empty")]
    EmptyPath,

    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(ConfigError::EmptyPath);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_config(&content, base_dir)
}

/// Parse, default and validate a config document.
///
/// `base_dir` anchors a relative `template.dir`.
pub fn parse_config(content: &str, base_dir: &Path) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    apply_defaults(&mut config);
    validate_config(&mut config)?;

    if let Some(dir) = config.template.dir().map(PathBuf::from) {
        if dir.is_relative() {
            let joined = base_dir.join(&dir);
            let resolved = std::path::absolute(&joined).map_err(|source| ConfigError::Io {
                path: joined.clone(),
                source,
            })?;
            config.template.dir = Some(resolved.to_string_lossy().into_owned());
        }
    }

    Ok(config)
}

/// Replace zero and empty values with their defaults.
///
/// Serde covers absent keys; this covers keys present with an empty value.
fn apply_defaults(config: &mut Config) {
    let server = &mut config.server;
    if server.listen.trim().is_empty() {
        server.listen = "0.0.0.0:8080".to_string();
    }
    if server.path.trim().is_empty() {
        server.path = "/alert".to_string();
    }
    if server.read_timeout_secs == 0 {
        server.read_timeout_secs = 5;
    }
    if server.write_timeout_secs == 0 {
        server.write_timeout_secs = 10;
    }
    if server.idle_timeout_secs == 0 {
        server.idle_timeout_secs = 60;
    }
    if server.max_body_bytes == 0 {
        server.max_body_bytes = 4 * 1024 * 1024;
    }

    if config.admin.path_prefix.trim().is_empty() {
        config.admin.path_prefix = "/admin".to_string();
    }
    if config.reload.interval_ms == 0 {
        config.reload.interval_ms = 2000;
    }
    if config.messaging.timeout_secs == 0 {
        config.messaging.timeout_secs = 5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MessageKind;

    const MINIMAL: &str = r#"
[[messaging.targets]]
name = "r1"
webhook = "http://example.invalid/robot/send"

[[messaging.groups]]
name = "default"
targets = ["r1"]
"#;

    #[test]
    fn test_defaults_and_template_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("[server]\nlisten = \"127.0.0.1:8080\"\n\n[template]\ndir = \"templates\"\n{MINIMAL}"),
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.server.path, "/alert");
        assert_eq!(config.server.max_body_bytes, 4 * 1024 * 1024);
        assert_eq!(config.admin.path_prefix, "/admin");
        assert_eq!(config.reload.interval_ms, 2000);
        assert_eq!(config.messaging.timeout_secs, 5);
        assert_eq!(config.messaging.targets[0].msg_type, MessageKind::Markdown);

        let want = dir.path().join("templates");
        assert_eq!(config.template.dir(), Some(want.to_string_lossy().as_ref()));
    }

    #[test]
    fn test_absolute_template_dir_untouched() {
        let text = format!("[template]\ndir = \"/srv/templates\"\n{MINIMAL}");
        let config = parse_config(&text, Path::new("/etc/relay")).unwrap();
        assert_eq!(config.template.dir(), Some("/srv/templates"));
    }

    #[test]
    fn test_explicit_empty_values_get_defaults() {
        let text = format!("[server]\npath = \"\"\nmax_body_bytes = 0\n[admin]\npath_prefix = \"\"\n{MINIMAL}");
        let config = parse_config(&text, Path::new("/")).unwrap();
        assert_eq!(config.server.path, "/alert");
        assert_eq!(config.server.max_body_bytes, 4 * 1024 * 1024);
        assert_eq!(config.admin.path_prefix, "/admin");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(load_config(Path::new("  ")), Err(ConfigError::EmptyPath)));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let err = parse_config("messaging = [invalid", Path::new("/")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_blank_message_kind_is_markdown() {
        let text = MINIMAL.replace(
            "webhook = \"http://example.invalid/robot/send\"",
            "webhook = \"http://example.invalid/robot/send\"\nmsg_type = \"\"",
        );
        let config = parse_config(&text, Path::new("/")).unwrap();
        assert_eq!(config.messaging.targets[0].msg_type, MessageKind::Markdown);

        let text = MINIMAL.replace(
            "webhook = \"http://example.invalid/robot/send\"",
            "webhook = \"http://example.invalid/robot/send\"\nmsg_type = \" text \"",
        );
        let config = parse_config(&text, Path::new("/")).unwrap();
        assert_eq!(config.messaging.targets[0].msg_type, MessageKind::Text);
    }

    #[test]
    fn test_unknown_message_kind_rejected() {
        let text = MINIMAL.replace(
            "webhook = \"http://example.invalid/robot/send\"",
            "webhook = \"http://example.invalid/robot/send\"\nmsg_type = \"card\"",
        );
        let err = parse_config(&text, Path::new("/")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("card"));
    }
}

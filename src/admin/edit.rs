//! Admin write path for the config file and the template directory.
//!
//! Every edit follows the same sequence: check the new content, write it
//! atomically, force a reload, and put the previous bytes back (then reload
//! again) if that reload fails. The served snapshot only ever changes through
//! a successful reload.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;

use crate::config::{parse_config, valid_template_name, ConfigError};
use crate::http::response;
use crate::reload::{ReloadError, ReloadManager};
use crate::runtime::{BuildError, RuntimeSnapshot};
use crate::template::{self, TemplateError, TEMPLATE_EXTENSION};

/// Unix permissions; ignored elsewhere.
const CONFIG_MODE: u32 = 0o600;
const TEMPLATE_MODE: u32 = 0o644;

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("invalid template name")]
    InvalidName,

    #[error("body must be valid utf-8")]
    Encoding,

    #[error("template.dir is not configured")]
    NoTemplateDir,

    #[error("path {path} must be under {base}")]
    OutsideBase { path: PathBuf, base: PathBuf },

    #[error("template not found")]
    NotFound,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Reload(ReloadError),

    #[error("edit task failed: {0}")]
    Task(String),
}

impl EditError {
    /// `reload_status` is used when the forced reload after a write fails.
    pub fn into_response(self, reload_status: StatusCode) -> Response {
        let status = match &self {
            EditError::InvalidName
            | EditError::Encoding
            | EditError::OutsideBase { .. }
            | EditError::Config(_)
            | EditError::Build(_)
            | EditError::Template(_) => StatusCode::BAD_REQUEST,
            EditError::NoTemplateDir => StatusCode::CONFLICT,
            EditError::NotFound => StatusCode::NOT_FOUND,
            EditError::Reload(_) => reload_status,
            EditError::Io { .. } | EditError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        response::error(status, self.to_string())
    }
}

/// File contents before an edit, for rollback.
#[derive(Debug)]
enum Previous {
    Contents(Vec<u8>),
    Absent,
}

impl Previous {
    fn read(path: &Path) -> Result<Self, EditError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Previous::Contents(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Previous::Absent),
            Err(source) => Err(io_error("read", path, source)),
        }
    }

    fn restore(self, path: &Path, mode: u32) -> Result<(), EditError> {
        match self {
            Previous::Contents(bytes) => write_atomic(path, &bytes, mode),
            Previous::Absent => match fs::remove_file(path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(io_error("remove", path, e)),
                _ => Ok(()),
            },
        }
    }
}

/// Replace the config file with `text` once it validates and compiles.
pub async fn replace_config(reload: &Arc<ReloadManager>, text: String) -> Result<(), EditError> {
    let path = reload.config_path().to_path_buf();
    let staged = path.clone();
    let previous = blocking(move || {
        let base_dir = staged.parent().map(Path::to_path_buf).unwrap_or_default();
        let config = parse_config(&text, &base_dir)?;
        // Compiled and dropped: the store only changes through the reload below.
        RuntimeSnapshot::build(staged.clone(), base_dir, config)?;

        let previous = Previous::read(&staged)?;
        write_atomic(&staged, text.as_bytes(), CONFIG_MODE)?;
        Ok(previous)
    })
    .await?;

    apply(reload, path, previous, CONFIG_MODE).await
}

/// Write `<dir>/<name>.tmpl` once `text` parses.
pub async fn put_template(reload: &Arc<ReloadManager>, name: &str, text: String) -> Result<(), EditError> {
    let path = template_path(reload, name)?;
    template::validate_text(&text)?;

    let target = path.clone();
    let previous = blocking(move || {
        let previous = Previous::read(&target)?;
        write_atomic(&target, text.as_bytes(), TEMPLATE_MODE)?;
        Ok(previous)
    })
    .await?;

    apply(reload, path, previous, TEMPLATE_MODE).await
}

/// Remove `<dir>/<name>.tmpl`. Fails the same way a reload would if a group
/// still uses it.
pub async fn delete_template(reload: &Arc<ReloadManager>, name: &str) -> Result<(), EditError> {
    let path = template_path(reload, name)?;

    let target = path.clone();
    let previous = blocking(move || match Previous::read(&target)? {
        Previous::Absent => Err(EditError::NotFound),
        previous => {
            fs::remove_file(&target).map_err(|e| io_error("remove", &target, e))?;
            Ok(previous)
        }
    })
    .await?;

    apply(reload, path, previous, TEMPLATE_MODE).await
}

/// Force a reload, rolling `path` back to `previous` if it fails.
async fn apply(
    reload: &Arc<ReloadManager>,
    path: PathBuf,
    previous: Previous,
    mode: u32,
) -> Result<(), EditError> {
    let Err(err) = reload.reload_async(true).await else {
        tracing::info!(path = %path.display(), "Admin edit applied");
        return Ok(());
    };

    tracing::warn!(path = %path.display(), error = %err, "Admin edit rejected by reload, rolling back");
    let target = path.clone();
    if let Err(e) = blocking(move || previous.restore(&target, mode)).await {
        tracing::error!(path = %path.display(), error = %e, "Rollback failed");
    } else if let Err(e) = reload.reload_async(true).await {
        tracing::error!(path = %path.display(), error = %e, "Reload after rollback failed");
    }
    Err(EditError::Reload(err))
}

fn template_path(reload: &ReloadManager, name: &str) -> Result<PathBuf, EditError> {
    if !valid_template_name(name) {
        return Err(EditError::InvalidName);
    }
    let snapshot = reload.store().load();
    let dir = snapshot.config.template.dir().ok_or(EditError::NoTemplateDir)?;
    let dir = ensure_under_base(&snapshot.base_dir, Path::new(dir))?;
    Ok(dir.join(format!("{name}.{TEMPLATE_EXTENSION}")))
}

/// Resolve `target` and require it to sit inside `base`.
fn ensure_under_base(base: &Path, target: &Path) -> Result<PathBuf, EditError> {
    // A bare `config.toml` has an empty parent.
    let base = if base.as_os_str().is_empty() { Path::new(".") } else { base };
    let base = std::path::absolute(base).map_err(|e| io_error("resolve", base, e))?;
    let resolved = std::path::absolute(base.join(target)).map_err(|e| io_error("resolve", target, e))?;
    let escapes = resolved
        .strip_prefix(&base)
        .map_or(true, |rel| rel.components().any(|c| matches!(c, std::path::Component::ParentDir)));
    if escapes {
        return Err(EditError::OutsideBase { path: resolved, base });
    }
    Ok(resolved)
}

/// Write through a sibling temp file and rename it over `path`.
fn write_atomic(path: &Path, data: &[u8], mode: u32) -> Result<(), EditError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| io_error("create", dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(dir)
        .map_err(|e| io_error("create temp file in", dir, e))?;
    tmp.write_all(data).map_err(|e| io_error("write", tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| io_error("sync", tmp.path(), e))?;
    set_mode(tmp.as_file(), mode).map_err(|e| io_error("chmod", path, e))?;
    tmp.persist(path).map_err(|e| io_error("rename onto", path, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: u32) -> io::Result<()> {
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T, EditError>
where
    F: FnOnce() -> Result<T, EditError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EditError::Task(e.to_string()))?
}

fn io_error(action: &'static str, path: &Path, source: io::Error) -> EditError {
    EditError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

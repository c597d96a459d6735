//! Change detection by file metadata.
//!
//! The digest covers the config file's path, size and mtime plus, when a
//! template directory is configured, every `*.tmpl` file in it. Content is
//! never read.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};

use crate::template::renderer::TEMPLATE_EXTENSION;

/// Hex SHA-256 of the watched files' metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read template dir {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fingerprint `config_path` and, if given, the template directory.
pub fn fingerprint(config_path: &Path, template_dir: Option<&Path>) -> Result<Fingerprint, FingerprintError> {
    let mut hasher = Sha256::new();
    hash_file_stat(&mut hasher, config_path)?;
    if let Some(dir) = template_dir {
        hash_template_dir(&mut hasher, dir)?;
    }
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

fn hash_file_stat(hasher: &mut Sha256, path: &Path) -> Result<(), FingerprintError> {
    let meta = fs::metadata(path).map_err(|source| FingerprintError::Stat {
        path: path.to_path_buf(),
        source,
    })?;
    // Platforms without mtime hash as zero; size and path still count.
    let mtime_nanos = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());

    hasher.update(b"file:");
    hasher.update(path.as_os_str().as_encoded_bytes());
    hasher.update([0]);
    hasher.update(format!("{}:{}", meta.len(), mtime_nanos).as_bytes());
    hasher.update([0]);
    Ok(())
}

fn hash_template_dir(hasher: &mut Sha256, dir: &Path) -> Result<(), FingerprintError> {
    hasher.update(b"dir:");
    hasher.update(dir.as_os_str().as_encoded_bytes());
    hasher.update([0]);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            hasher.update(b"missing");
            hasher.update([0]);
            return Ok(());
        }
        Err(source) => {
            return Err(FingerprintError::ReadDir {
                dir: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| FingerprintError::ReadDir {
                dir: dir.to_path_buf(),
                source,
            })?
            .path();
        if !path.is_dir() && path.extension().and_then(|e| e.to_str()) == Some(TEMPLATE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();

    for file in files {
        hash_file_stat(hasher, &file)?;
    }
    Ok(())
}

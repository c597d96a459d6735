//! Compiled template set.
//!
//! # Responsibilities
//! - Compile the embedded default plus `*.tmpl` overrides from a directory
//! - Render a named template against an alert payload
//! - Validate and render ad-hoc template text for previews

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde::Serialize;

use crate::alert::WebhookMessage;
use crate::config::{valid_template_name, TemplateConfig};
use crate::template::functions::new_environment;

/// Name of the fallback template.
pub const DEFAULT_TEMPLATE: &str = "default";

/// File extension recognized in the template directory.
pub const TEMPLATE_EXTENSION: &str = "tmpl";

const EMBEDDED_DEFAULT: &str = include_str!("default.tmpl");

const PREVIEW_TEMPLATE: &str = "preview";

/// Source of the built-in fallback template.
pub fn embedded_default_text() -> &'static str {
    EMBEDDED_DEFAULT
}

/// Template compilation and rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("read template dir {dir}: {source}")]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse template {name:?}: {source}")]
    Compile {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("default template {0:?} not found")]
    DefaultMissing(String),

    #[error("template {0:?} not found")]
    NotFound(String),

    #[error("execute template {name:?}: {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Context handed to every template.
#[derive(Serialize)]
struct RenderData<'a> {
    payload: &'a WebhookMessage,
    firing_count: usize,
    resolved_count: usize,
}

impl<'a> RenderData<'a> {
    fn new(payload: &'a WebhookMessage) -> Self {
        Self {
            payload,
            firing_count: payload.firing_count(),
            resolved_count: payload.resolved_count(),
        }
    }
}

/// A compiled, immutable set of named templates.
pub struct Renderer {
    env: Environment<'static>,
    default_name: String,
    /// Source text per template name, as compiled.
    sources: BTreeMap<String, String>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("default_name", &self.default_name)
            .field("templates", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Renderer {
    /// Compile the embedded default and any directory overrides.
    ///
    /// A missing directory falls back to the embedded template only; any other
    /// directory error is fatal.
    pub fn new(config: &TemplateConfig) -> Result<Self, TemplateError> {
        let mut sources = BTreeMap::new();
        sources.insert(DEFAULT_TEMPLATE.to_string(), EMBEDDED_DEFAULT.to_string());

        if let Some(dir) = config.dir() {
            load_dir(Path::new(dir), &mut sources)?;
        }

        let mut env = new_environment();
        for (name, source) in &sources {
            env.add_template_owned(name.clone(), source.clone())
                .map_err(|source| TemplateError::Compile {
                    name: name.clone(),
                    source,
                })?;
        }

        if !sources.contains_key(DEFAULT_TEMPLATE) {
            return Err(TemplateError::DefaultMissing(DEFAULT_TEMPLATE.to_string()));
        }

        tracing::debug!(templates = ?sources.keys().collect::<Vec<_>>(), "Templates compiled");

        Ok(Self {
            env,
            default_name: DEFAULT_TEMPLATE.to_string(),
            sources,
        })
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Sorted template names.
    pub fn template_names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Source text a template was compiled from.
    pub fn source(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    /// Render `name` (the default when blank) against `payload`.
    pub fn render(&self, name: &str, payload: &WebhookMessage) -> Result<String, TemplateError> {
        let name = match name.trim() {
            "" => self.default_name.as_str(),
            name => name,
        };
        let template = self
            .env
            .get_template(name)
            .map_err(|_| TemplateError::NotFound(name.to_string()))?;
        let rendered = template
            .render(RenderData::new(payload))
            .map_err(|source| TemplateError::Render {
                name: name.to_string(),
                source,
            })?;
        Ok(rendered.trim().to_string())
    }
}

/// Parse template text without rendering it.
pub fn validate_text(text: &str) -> Result<(), TemplateError> {
    let env = new_environment();
    env.template_from_str(text)
        .map(|_| ())
        .map_err(|source| TemplateError::Compile {
            name: PREVIEW_TEMPLATE.to_string(),
            source,
        })
}

/// Render ad-hoc template text exactly as a compiled template would render.
pub fn render_text(text: &str, payload: &WebhookMessage) -> Result<String, TemplateError> {
    let env = new_environment();
    let template = env
        .template_from_str(text)
        .map_err(|source| TemplateError::Compile {
            name: PREVIEW_TEMPLATE.to_string(),
            source,
        })?;
    let rendered = template
        .render(RenderData::new(payload))
        .map_err(|source| TemplateError::Render {
            name: PREVIEW_TEMPLATE.to_string(),
            source,
        })?;
    Ok(rendered.trim().to_string())
}

fn load_dir(dir: &Path, sources: &mut BTreeMap<String, String>) -> Result<(), TemplateError> {
    let read_dir_err = |source| TemplateError::ReadDir {
        dir: dir.to_path_buf(),
        source,
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "Template dir missing, using embedded default only");
            return Ok(());
        }
        Err(e) => return Err(read_dir_err(e)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    for path in paths {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !valid_template_name(name) {
            tracing::warn!(file = %path.display(), "Skipping template with invalid name");
            continue;
        }
        let text = fs::read_to_string(&path).map_err(|source| TemplateError::Read {
            path: path.clone(),
            source,
        })?;
        sources.insert(name.to_string(), text);
    }
    Ok(())
}

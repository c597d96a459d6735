//! Message templating.
//!
//! # Data Flow
//! ```text
//! TemplateConfig.dir
//!     → renderer.rs (embedded default + *.tmpl overrides, compiled once)
//!     → functions.rs (shared filter set)
//!     → Renderer::render(name, payload) → trimmed text
//! ```
//!
//! # Design Decisions
//! - A file named `default.tmpl` replaces the embedded default
//! - A missing directory is tolerated; any other read error fails the build
//! - Preview helpers compile through the same environment as production

pub mod functions;
pub mod renderer;

pub use renderer::{
    embedded_default_text, render_text, validate_text, Renderer, TemplateError, DEFAULT_TEMPLATE,
    TEMPLATE_EXTENSION,
};

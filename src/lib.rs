//! Alertmanager webhook relay to chat-robot endpoints.

// Core subsystems
pub mod alert;
pub mod config;
pub mod routing;
pub mod runtime;
pub mod template;

// Delivery and transport
pub mod admin;
pub mod http;
pub mod outbound;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod reload;

pub use config::Config;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use reload::ReloadManager;
pub use runtime::{RuntimeSnapshot, RuntimeStore};

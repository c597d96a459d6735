//! Outbound chat-robot delivery.
//!
//! # Data Flow
//! ```text
//! Rendered text + effective mention
//!     → message.rs (mention tokens, JSON body)
//!     → client.rs (optional HMAC signing, POST, response check)
//! ```

pub mod client;
pub mod message;

pub use client::{sign, MessagingClient};
pub use message::{build_payload, OutboundMessage, FALLBACK_TITLE};

/// Delivery errors for a single target.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("parse webhook url: {0}")]
    InvalidUrl(String),

    #[error("sign request: {0}")]
    Signing(String),

    #[error("{0} content is empty")]
    EmptyContent(&'static str),

    #[error("encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("post webhook: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("webhook http {status}: {message}")]
    Status { status: u16, message: String },

    #[error("webhook errcode={code} errmsg={message}")]
    Api { code: i64, message: String },
}

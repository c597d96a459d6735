//! Webhook delivery with optional request signing.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use sha2::Sha256;
use url::Url;

use crate::outbound::message::{build_payload, OutboundMessage};
use crate::outbound::SendError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client shared by every target of a snapshot.
#[derive(Debug, Clone)]
pub struct MessagingClient {
    http: reqwest::Client,
    timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiResponse {
    errcode: i64,
    errmsg: String,
}

impl MessagingClient {
    /// Build a client; a zero timeout falls back to five seconds.
    pub fn new(timeout: Duration) -> Result<Self, SendError> {
        let timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SendError::Client)?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `msg` to `webhook`, signing the URL when `secret` is set.
    ///
    /// Succeeds only on a 2xx status with `errcode == 0`.
    pub async fn send(
        &self,
        webhook: &str,
        secret: &str,
        msg: &OutboundMessage,
    ) -> Result<(), SendError> {
        let mut url = Url::parse(webhook).map_err(|e| SendError::InvalidUrl(e.to_string()))?;
        if !secret.is_empty() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            sign_url(&mut url, timestamp, secret)?;
        }
        let body = build_payload(msg)?;

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(SendError::Transport)?;

        let status = response.status();
        let api: ApiResponse = response.json().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SendError::Status {
                status: status.as_u16(),
                message: api.errmsg,
            });
        }
        if api.errcode != 0 {
            return Err(SendError::Api {
                code: api.errcode,
                message: api.errmsg,
            });
        }
        Ok(())
    }
}

/// `base64(HMAC-SHA256(secret, "{timestamp}\n{secret}"))`.
pub fn sign(timestamp: i64, secret: &str) -> Result<String, SendError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| SendError::Signing(e.to_string()))?;
    mac.update(format!("{timestamp}\n{secret}").as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn sign_url(url: &mut Url, timestamp: i64, secret: &str) -> Result<(), SendError> {
    let signature = sign(timestamp, secret)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "timestamp" && k != "sign")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    pairs.extend_pairs(kept);
    pairs.append_pair("timestamp", &timestamp.to_string());
    pairs.append_pair("sign", &signature);
    drop(pairs);
    Ok(())
}

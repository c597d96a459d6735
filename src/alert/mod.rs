//! Alertmanager webhook payload.
//!
//! Field names follow Alertmanager's webhook JSON (camelCase). Every field is
//! defaulted so partial payloads from admin previews still decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label or annotation set. Ordered so templates iterate deterministically.
pub type KeyValues = BTreeMap<String, String>;

/// One webhook notification, possibly carrying several alerts.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebhookMessage {
    pub version: String,
    pub group_key: String,
    pub truncated_alerts: u64,
    pub status: String,
    pub receiver: String,
    pub group_labels: KeyValues,
    pub common_labels: KeyValues,
    pub common_annotations: KeyValues,
    #[serde(rename = "externalURL")]
    pub external_url: String,
    pub alerts: Vec<Alert>,
}

/// A single alert inside a notification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Alert {
    pub status: String,
    pub labels: KeyValues,
    pub annotations: KeyValues,
    pub starts_at: String,
    pub ends_at: String,
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
    pub fingerprint: String,
}

impl WebhookMessage {
    /// Number of alerts whose status is `firing` (case-insensitive).
    pub fn firing_count(&self) -> usize {
        self.count_status("firing")
    }

    /// Number of alerts whose status is `resolved` (case-insensitive).
    pub fn resolved_count(&self) -> usize {
        self.count_status("resolved")
    }

    fn count_status(&self, status: &str) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.status.eq_ignore_ascii_case(status))
            .count()
    }

    /// Title for markdown messages when the target has none configured.
    ///
    /// Prefers a `summary` annotation, then an `alertname` label, looking at
    /// the common set before the first alert.
    pub fn default_title(&self) -> String {
        let first = self.alerts.first();
        let candidates = [
            self.common_annotations.get("summary"),
            first.and_then(|a| a.annotations.get("summary")),
            self.common_labels.get("alertname"),
            first.and_then(|a| a.labels.get("alertname")),
        ];
        candidates
            .into_iter()
            .flatten()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .unwrap_or("Alertmanager")
            .to_string()
    }
}

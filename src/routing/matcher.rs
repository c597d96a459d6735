//! Payload matching logic.
//!
//! # Responsibilities
//! - Match receiver name (exact)
//! - Match notification status (case-insensitive)
//! - Match label values (exact, common labels first, then any alert)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Within one dimension any listed value matches (OR)
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use crate::alert::WebhookMessage;
use crate::config::WhenConfig;

/// Trait for matching payloads against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the payload matches this condition.
    fn matches(&self, msg: &WebhookMessage) -> bool;
}

/// Matches the webhook receiver.
#[derive(Debug, Clone)]
pub struct ReceiverMatcher {
    allowed: Vec<String>,
}

impl ReceiverMatcher {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }
}

impl Matcher for ReceiverMatcher {
    fn matches(&self, msg: &WebhookMessage) -> bool {
        self.allowed.iter().any(|r| *r == msg.receiver)
    }
}

/// Matches the notification status.
#[derive(Debug, Clone)]
pub struct StatusMatcher {
    allowed: Vec<String>,
}

impl StatusMatcher {
    /// Statuses are normalized to lowercase for case-insensitive matching.
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed: allowed.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }
}

impl Matcher for StatusMatcher {
    fn matches(&self, msg: &WebhookMessage) -> bool {
        let status = msg.status.to_lowercase();
        self.allowed.iter().any(|s| *s == status)
    }
}

/// Matches one label key against a set of allowed values.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    key: String,
    allowed: Vec<String>,
}

impl LabelMatcher {
    pub fn new(key: impl Into<String>, allowed: Vec<String>) -> Self {
        Self {
            key: key.into(),
            allowed,
        }
    }

    fn allows(&self, value: &str) -> bool {
        self.allowed.iter().any(|v| v == value)
    }
}

impl Matcher for LabelMatcher {
    fn matches(&self, msg: &WebhookMessage) -> bool {
        // Common labels are authoritative when they carry the key.
        if let Some(value) = msg.common_labels.get(&self.key) {
            return self.allows(value);
        }
        msg.alerts
            .iter()
            .filter_map(|a| a.labels.get(&self.key))
            .any(|v| self.allows(v))
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug, Default)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// Compile a predicate, skipping empty dimensions.
    pub fn from_when(when: &WhenConfig) -> Self {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
        if !when.receiver.is_empty() {
            matchers.push(Box::new(ReceiverMatcher::new(when.receiver.clone())));
        }
        if !when.status.is_empty() {
            matchers.push(Box::new(StatusMatcher::new(when.status.clone())));
        }
        for (key, values) in &when.labels {
            if !values.is_empty() {
                matchers.push(Box::new(LabelMatcher::new(key.clone(), values.clone())));
            }
        }
        Self { matchers }
    }

    /// True when no condition is configured.
    pub fn is_wildcard(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, msg: &WebhookMessage) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(msg))
    }
}

//! Delivery of one alert payload against one snapshot.
//!
//! # Data Flow
//! ```text
//! WebhookMessage
//!     → resolve_groups (first matching route, else `default`)
//!     → per group: render template, fold mention rules
//!     → per target: build message, send
//!     → collect failures; every target is attempted
//! ```

use crate::alert::WebhookMessage;
use crate::config::{MessageKind, TargetConfig};
use crate::observability::metrics;
use crate::outbound::OutboundMessage;
use crate::routing::{resolve_groups, Mention};
use crate::runtime::group::Group;
use crate::runtime::RuntimeSnapshot;

/// Dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown group {0:?}")]
    UnknownGroup(String),

    #[error("{} delivery failure(s): {}", .failures.len(), .failures.join("; "))]
    Failed { failures: Vec<String> },
}

/// Route `msg` and deliver it to every target of every matched group.
///
/// Returns the number of successful deliveries.
pub async fn dispatch(snapshot: &RuntimeSnapshot, msg: &WebhookMessage) -> Result<usize, DispatchError> {
    let mut failures = Vec::new();
    let mut delivered = 0;

    for name in resolve_groups(&snapshot.routes, msg) {
        let Some(group) = snapshot.groups.get(&name) else {
            failures.push(format!("unknown group {name:?}"));
            continue;
        };
        let content = match snapshot.renderer.render(&group.template, msg) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(group = %group.name, error = %e, "Render failed");
                failures.push(format!("group {:?}: {e}", group.name));
                continue;
            }
        };
        delivered += deliver(snapshot, group, msg, &content, &mut failures).await;
    }

    finish(delivered, failures)
}

/// Deliver to one named group, bypassing routes.
///
/// `raw_text`, when given, is sent verbatim instead of rendering the group's
/// template.
pub async fn send_to_group(
    snapshot: &RuntimeSnapshot,
    group_name: &str,
    msg: &WebhookMessage,
    raw_text: Option<&str>,
) -> Result<usize, DispatchError> {
    let group = snapshot
        .groups
        .get(group_name)
        .ok_or_else(|| DispatchError::UnknownGroup(group_name.to_string()))?;

    let content = match raw_text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => text.to_string(),
        None => snapshot
            .renderer
            .render(&group.template, msg)
            .map_err(|e| DispatchError::Failed {
                failures: vec![format!("group {:?}: {e}", group.name)],
            })?,
    };

    let mut failures = Vec::new();
    let delivered = deliver(snapshot, group, msg, &content, &mut failures).await;
    finish(delivered, failures)
}

/// Build the message a target receives for `content`.
pub fn outbound_message(
    target: &TargetConfig,
    msg: &WebhookMessage,
    content: &str,
    mention: &Mention,
) -> OutboundMessage {
    let title = match target.msg_type {
        MessageKind::Markdown => target
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| msg.default_title()),
        MessageKind::Text => String::new(),
    };
    OutboundMessage {
        kind: target.msg_type,
        title,
        content: content.to_string(),
        mention: mention.clone(),
    }
}

async fn deliver(
    snapshot: &RuntimeSnapshot,
    group: &Group,
    msg: &WebhookMessage,
    content: &str,
    failures: &mut Vec<String>,
) -> usize {
    let mention = group.effective_mention(msg);
    let mut delivered = 0;

    for target in &group.targets {
        let outbound = outbound_message(target, msg, content, &mention);
        let result = snapshot
            .client
            .send(target.webhook.expose(), target.secret.expose(), &outbound)
            .await;
        metrics::record_send(&target.name, result.is_ok());

        match result {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::error!(
                    target = %target.name,
                    group = %group.name,
                    receiver = %msg.receiver,
                    error = %e,
                    "Send failed"
                );
                failures.push(format!("target {:?}: {e}", target.name));
            }
        }
    }
    delivered
}

fn finish(delivered: usize, failures: Vec<String>) -> Result<usize, DispatchError> {
    if failures.is_empty() {
        Ok(delivered)
    } else {
        Err(DispatchError::Failed { failures })
    }
}

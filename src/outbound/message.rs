//! Outbound chat-robot payloads.
//!
//! # Responsibilities
//! - Append mention tokens to message content
//! - Build the JSON body for markdown and text messages
//! - Omit the `at` object when nothing is mentioned

use std::collections::HashSet;

use serde::Serialize;

use crate::config::MessageKind;
use crate::outbound::SendError;
use crate::routing::Mention;

/// Markdown title used when neither target nor payload supplies one.
pub const FALLBACK_TITLE: &str = "Alertmanager";

const ALL_TOKEN: &str = "@all";

/// A rendered message ready for delivery.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub title: String,
    pub content: String,
    pub mention: Mention,
}

#[derive(Debug, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
enum Body<'a> {
    Markdown {
        markdown: MarkdownBody<'a>,
        #[serde(skip_serializing_if = "Option::is_none")]
        at: Option<AtBody<'a>>,
    },
    Text {
        text: TextBody,
        #[serde(skip_serializing_if = "Option::is_none")]
        at: Option<AtBody<'a>>,
    },
}

#[derive(Debug, Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: String,
}

#[derive(Debug, Serialize)]
struct TextBody {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AtBody<'a> {
    is_at_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    at_mobiles: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    at_user_ids: Option<&'a [String]>,
}

impl<'a> AtBody<'a> {
    fn from_mention(mention: &'a Mention) -> Option<Self> {
        if mention.is_empty() {
            return None;
        }
        let non_empty = |ids: &'a [String]| (!mention.at_all && !ids.is_empty()).then_some(ids);
        Some(Self {
            is_at_all: mention.at_all,
            at_mobiles: non_empty(&mention.at_mobiles),
            at_user_ids: non_empty(&mention.at_user_ids),
        })
    }
}

/// Serialize `msg` into the robot's JSON body.
pub fn build_payload(msg: &OutboundMessage) -> Result<Vec<u8>, SendError> {
    if msg.content.is_empty() {
        return Err(SendError::EmptyContent(msg.kind.as_str()));
    }
    let content = with_mentions(&msg.content, msg.kind, &msg.mention);
    let at = AtBody::from_mention(&msg.mention);

    let body = match msg.kind {
        MessageKind::Markdown => Body::Markdown {
            markdown: MarkdownBody {
                title: if msg.title.is_empty() { FALLBACK_TITLE } else { &msg.title },
                text: content,
            },
            at,
        },
        MessageKind::Text => Body::Text {
            text: TextBody { content },
            at,
        },
    };
    Ok(serde_json::to_vec(&body)?)
}

/// Append `@` tokens the robot needs to notify people.
pub fn with_mentions(content: &str, kind: MessageKind, mention: &Mention) -> String {
    let tokens = mention_tokens(content, mention);
    if content.is_empty() || tokens.is_empty() {
        return content.to_string();
    }
    let separator = match kind {
        MessageKind::Markdown => "\n\n",
        MessageKind::Text => "\n",
    };
    format!("{content}{separator}{}", tokens.join(" "))
}

/// Tokens not already present in `content`, user ids first then mobiles.
fn mention_tokens(content: &str, mention: &Mention) -> Vec<String> {
    if mention.at_all {
        if content.contains(ALL_TOKEN) {
            return Vec::new();
        }
        return vec![ALL_TOKEN.to_string()];
    }

    let mut seen = HashSet::new();
    mention
        .at_user_ids
        .iter()
        .chain(&mention.at_mobiles)
        .filter_map(|id| {
            let id = id.trim();
            let id = id.strip_prefix('@').unwrap_or(id);
            (!id.is_empty()).then(|| format!("@{id}"))
        })
        .filter(|token| !content.contains(token.as_str()) && seen.insert(token.clone()))
        .collect()
}

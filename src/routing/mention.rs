//! Mention policies and their override rules.

use std::collections::HashSet;

use crate::alert::WebhookMessage;
use crate::config::{MentionConfig, MentionRuleConfig};
use crate::routing::matcher::{AndMatcher, Matcher};

/// Normalized mention targets.
///
/// `at_all` discards individual targets; identifiers are trimmed, stripped of
/// a leading `@`, and de-duplicated keeping first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Mention {
    pub at_all: bool,
    pub at_mobiles: Vec<String>,
    pub at_user_ids: Vec<String>,
}

impl Mention {
    /// Normalize a configured policy.
    pub fn normalized(config: &MentionConfig) -> Self {
        Self {
            at_all: config.at_all,
            at_mobiles: config.at_mobiles.clone(),
            at_user_ids: config.at_user_ids.clone(),
        }
        .normalize()
    }

    pub fn normalize(self) -> Self {
        if self.at_all {
            return Self {
                at_all: true,
                ..Default::default()
            };
        }
        Self {
            at_all: false,
            at_mobiles: normalize_ids(self.at_mobiles),
            at_user_ids: normalize_ids(self.at_user_ids),
        }
    }

    /// Overlay the fields `other` sets onto `self`.
    ///
    /// `at_all` is sticky once set; non-empty lists replace the current ones.
    pub fn merge(mut self, other: &Mention) -> Self {
        if other.at_all {
            self.at_all = true;
        }
        if !other.at_mobiles.is_empty() {
            self.at_mobiles = other.at_mobiles.clone();
        }
        if !other.at_user_ids.is_empty() {
            self.at_user_ids = other.at_user_ids.clone();
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.at_all && self.at_mobiles.is_empty() && self.at_user_ids.is_empty()
    }
}

fn normalize_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter()
        .filter_map(|id| {
            let id = id.trim();
            let id = id.strip_prefix('@').unwrap_or(id);
            (!id.is_empty()).then(|| id.to_string())
        })
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// A compiled mention override.
#[derive(Debug)]
pub struct MentionRule {
    pub name: String,
    pub matcher: AndMatcher,
    pub mention: Mention,
}

impl MentionRule {
    pub fn compile(config: &MentionRuleConfig) -> Self {
        Self {
            name: config.name.trim().to_string(),
            matcher: AndMatcher::from_when(&config.when),
            mention: Mention::normalized(&config.mention),
        }
    }
}

/// Fold matching rules over `base` in order, then normalize once.
pub fn effective_mention(base: &Mention, rules: &[MentionRule], msg: &WebhookMessage) -> Mention {
    rules
        .iter()
        .filter(|rule| rule.matcher.matches(msg))
        .fold(base.clone(), |acc, rule| acc.merge(&rule.mention))
        .normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WhenConfig;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_at_all_clears_individual_targets() {
        let mention = Mention::normalized(&MentionConfig {
            at_all: true,
            at_mobiles: ids(&["13800138000"]),
            at_user_ids: ids(&["u1"]),
        });
        assert!(mention.at_all);
        assert!(mention.at_mobiles.is_empty());
        assert!(mention.at_user_ids.is_empty());
    }

    #[test]
    fn test_identifiers_trimmed_stripped_deduplicated() {
        let mention = Mention::normalized(&MentionConfig {
            at_all: false,
            at_mobiles: ids(&[" 138 ", "@138", ""]),
            at_user_ids: ids(&["@u1", "u1", " u2 "]),
        });
        assert_eq!(mention.at_user_ids, ids(&["u1", "u2"]));
        assert_eq!(mention.at_mobiles, ids(&["138"]));
    }

    #[test]
    fn test_rules_merge_field_by_field() {
        let rule = |name: &str, severity: &str, mention: MentionConfig| {
            let mut when = WhenConfig::default();
            when.labels.insert("severity".into(), vec![severity.into()]);
            MentionRule::compile(&MentionRuleConfig {
                name: name.into(),
                when,
                mention,
            })
        };
        let rules = vec![
            rule("mobiles", "critical", MentionConfig {
                at_mobiles: ids(&["111"]),
                ..Default::default()
            }),
            rule("users", "critical", MentionConfig {
                at_user_ids: ids(&["@lead"]),
                ..Default::default()
            }),
            rule("override", "critical", MentionConfig {
                at_mobiles: ids(&["222"]),
                ..Default::default()
            }),
            rule("never", "info", MentionConfig {
                at_all: true,
                ..Default::default()
            }),
        ];
        let base = Mention::normalized(&MentionConfig {
            at_user_ids: ids(&["oncall"]),
            ..Default::default()
        });

        let mut msg = WebhookMessage::default();
        msg.common_labels.insert("severity".into(), "critical".into());
        let effective = effective_mention(&base, &rules, &msg);
        assert!(!effective.at_all);
        assert_eq!(effective.at_mobiles, ids(&["222"]));
        assert_eq!(effective.at_user_ids, ids(&["lead"]));

        msg.common_labels.insert("severity".into(), "warning".into());
        assert_eq!(effective_mention(&base, &rules, &msg), base);
    }
}

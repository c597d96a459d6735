//! Compiled target groups.

use std::collections::HashMap;

use crate::alert::WebhookMessage;
use crate::config::{valid_template_name, Config, TargetConfig};
use crate::routing::{effective_mention, Mention, MentionRule};
use crate::runtime::BuildError;
use crate::template::DEFAULT_TEMPLATE;

/// A group bound to its targets, template and mention policy.
#[derive(Debug)]
pub struct Group {
    pub name: String,
    pub targets: Vec<TargetConfig>,
    pub template: String,
    pub mention: Mention,
    pub mention_rules: Vec<MentionRule>,
}

impl Group {
    /// Base mention with every matching rule folded in.
    pub fn effective_mention(&self, msg: &WebhookMessage) -> Mention {
        effective_mention(&self.mention, &self.mention_rules, msg)
    }
}

/// Index targets by trimmed name.
pub fn targets_by_name(config: &Config) -> HashMap<String, TargetConfig> {
    config
        .messaging
        .targets
        .iter()
        .map(|t| (t.name.trim().to_string(), t.clone()))
        .collect()
}

/// Compile every configured group against the declared targets.
pub fn compile_groups(
    config: &Config,
    targets: &HashMap<String, TargetConfig>,
) -> Result<HashMap<String, Group>, BuildError> {
    let mut groups = HashMap::with_capacity(config.messaging.groups.len());
    for group in &config.messaging.groups {
        let name = group.name.trim();
        if name.is_empty() {
            return Err(BuildError::GroupNameEmpty);
        }

        let template = match group.template.trim() {
            "" => DEFAULT_TEMPLATE,
            t => t,
        };
        if !valid_template_name(template) {
            return Err(BuildError::InvalidTemplateName {
                group: name.to_string(),
                template: template.to_string(),
            });
        }

        let resolved = group
            .targets
            .iter()
            .map(|target| {
                targets
                    .get(target.trim())
                    .cloned()
                    .ok_or_else(|| BuildError::UnknownTarget {
                        group: name.to_string(),
                        target: target.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        groups.insert(
            name.to_string(),
            Group {
                name: name.to_string(),
                targets: resolved,
                template: template.to_string(),
                mention: Mention::normalized(&group.mention),
                mention_rules: group.mention_rules.iter().map(MentionRule::compile).collect(),
            },
        );
    }
    Ok(groups)
}

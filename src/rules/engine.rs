use super::config::{RuleConfig, ENABLED_KEY};
use super::context::ExecutionContext;
use super::{BrokenLinksRule, DuplicateContentRule, QualityRule, SeoRule, StaleContentRule};
use crate::error::{AuditError, Result};
use crate::report::{Issue, RuleCategory, RuleMetadata};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Trait for implementing audit rules
pub trait Rule: Send + Sync {
    /// Unique identifier for the rule
    fn id(&self) -> &'static str;

    /// Current metadata, including the enabled flag
    fn metadata(&self) -> RuleMetadata;

    /// Evaluate the rule against one article. Must not mutate shared state.
    fn execute(&self, ctx: &ExecutionContext<'_>) -> anyhow::Result<Option<Issue>>;

    /// Check a partial configuration; `Err` carries the reason it is rejected
    fn check_config(&self, partial: &RuleConfig) -> std::result::Result<(), String>;

    /// Apply a partial configuration; false if rejected
    fn update_config(&self, partial: &RuleConfig) -> bool;

    /// Current configuration as key/value pairs
    fn config(&self) -> RuleConfig;

    fn set_enabled(&self, enabled: bool);

    fn validate_config(&self, partial: &RuleConfig) -> bool {
        self.check_config(partial).is_ok()
    }

    fn is_enabled(&self) -> bool {
        self.metadata().enabled
    }
}

/// The built-in detectors
pub enum BuiltinRule {
    StaleContent(StaleContentRule),
    Quality(QualityRule),
    DuplicateContent(DuplicateContentRule),
    BrokenLinks(BrokenLinksRule),
    Seo(SeoRule),
}

impl BuiltinRule {
    /// One instance of every detector with default settings
    pub fn all() -> Vec<BuiltinRule> {
        vec![
            BuiltinRule::StaleContent(StaleContentRule::default()),
            BuiltinRule::Quality(QualityRule::default()),
            BuiltinRule::DuplicateContent(DuplicateContentRule::default()),
            BuiltinRule::BrokenLinks(BrokenLinksRule::default()),
            BuiltinRule::Seo(SeoRule::default()),
        ]
    }

    fn inner(&self) -> &dyn Rule {
        match self {
            BuiltinRule::StaleContent(rule) => rule,
            BuiltinRule::Quality(rule) => rule,
            BuiltinRule::DuplicateContent(rule) => rule,
            BuiltinRule::BrokenLinks(rule) => rule,
            BuiltinRule::Seo(rule) => rule,
        }
    }
}

impl Rule for BuiltinRule {
    fn id(&self) -> &'static str {
        self.inner().id()
    }

    fn metadata(&self) -> RuleMetadata {
        self.inner().metadata()
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> anyhow::Result<Option<Issue>> {
        self.inner().execute(ctx)
    }

    fn check_config(&self, partial: &RuleConfig) -> std::result::Result<(), String> {
        self.inner().check_config(partial)
    }

    fn update_config(&self, partial: &RuleConfig) -> bool {
        self.inner().update_config(partial)
    }

    fn config(&self) -> RuleConfig {
        self.inner().config()
    }

    fn set_enabled(&self, enabled: bool) {
        self.inner().set_enabled(enabled)
    }
}

/// Criteria for listing rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFilter {
    pub category: Option<RuleCategory>,
    pub enabled: Option<bool>,
}

impl RuleFilter {
    pub fn matches(&self, metadata: &RuleMetadata) -> bool {
        self.category.map_or(true, |c| metadata.category == c)
            && self.enabled.map_or(true, |e| metadata.enabled == e)
    }
}

/// Registry for managing rules, in registration order
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Create a new empty rule registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in detector
    pub fn with_default_rules() -> Self {
        let mut registry = Self::new();
        for rule in BuiltinRule::all() {
            registry.register(Arc::new(rule));
        }
        registry
    }

    /// Register a rule, replacing any rule with the same id
    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        let id = rule.id();
        match self.rules.iter_mut().find(|r| r.id() == id) {
            Some(existing) => {
                debug!(rule_id = id, "Replacing registered rule");
                *existing = rule;
            }
            None => {
                debug!(rule_id = id, "Registered rule");
                self.rules.push(rule);
            }
        }
    }

    pub fn get_rule(&self, id: &str) -> Option<Arc<dyn Rule>> {
        self.rules.iter().find(|r| r.id() == id).cloned()
    }

    /// Metadata of rules matching the filter
    pub fn list_rules(&self, filter: &RuleFilter) -> Vec<RuleMetadata> {
        self.rules
            .iter()
            .map(|r| r.metadata())
            .filter(|m| filter.matches(m))
            .collect()
    }

    /// Rules currently enabled, in registration order
    pub fn enabled_rules(&self) -> Vec<Arc<dyn Rule>> {
        self.rules.iter().filter(|r| r.is_enabled()).cloned().collect()
    }

    /// Apply a partial configuration to one rule
    pub fn update_rule_config(&self, id: &str, partial: &RuleConfig) -> Result<()> {
        let rule = self
            .get_rule(id)
            .ok_or_else(|| AuditError::RuleNotFound { id: id.to_string() })?;

        if !rule.metadata().configurable {
            warn!(rule_id = id, "Rejected config update for non-configurable rule");
            return Err(AuditError::NotConfigurable {
                rule_id: id.to_string(),
            });
        }

        let invalid = |reason: String| {
            warn!(rule_id = id, reason = %reason, "Rejected rule config update");
            AuditError::InvalidConfig {
                rule_id: id.to_string(),
                reason,
            }
        };
        rule.check_config(partial).map_err(invalid)?;
        if !rule.update_config(partial) {
            return Err(invalid("rule refused the update".to_string()));
        }

        let keys: Vec<&str> = partial.keys().map(String::as_str).collect();
        info!(rule_id = id, keys = ?keys, "Updated rule config");
        Ok(())
    }

    /// Enable or disable a rule regardless of whether its settings are configurable
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        let rule = self
            .get_rule(id)
            .ok_or_else(|| AuditError::RuleNotFound { id: id.to_string() })?;
        rule.set_enabled(enabled);
        info!(rule_id = id, enabled, "Changed rule state");
        Ok(())
    }

    /// Split `enabled` out of a partial config: toggle the flag, then apply the rest
    pub fn apply_rule_config(&self, id: &str, partial: &RuleConfig) -> Result<()> {
        let mut rest = partial.clone();
        let enabled = rest.remove(ENABLED_KEY);

        if !rest.is_empty() {
            self.update_rule_config(id, &rest)?;
        }
        match enabled {
            None => Ok(()),
            Some(serde_json::Value::Bool(enabled)) => self.set_enabled(id, enabled),
            Some(other) => Err(AuditError::InvalidConfig {
                rule_id: id.to_string(),
                reason: format!("'{}' must be a boolean, got {}", ENABLED_KEY, other),
            }),
        }
    }

    /// Get the number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Get list of registered rule IDs
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }
}

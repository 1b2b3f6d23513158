use crate::audit::{EngineSettings, DEFAULT_MAX_CONCURRENCY};
use crate::rules::{RuleConfig, RuleRegistry};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Engine configuration file.
///
/// ```toml
/// [engine]
/// max_concurrency = 4
/// article_timeout_secs = 30
///
/// [rules.stale-content]
/// max_age_months = 6
/// enabled = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub engine: EngineSection,
    /// Partial configuration per rule id
    pub rules: BTreeMap<String, RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    pub max_concurrency: usize,
    pub article_timeout_secs: Option<u64>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            article_timeout_secs: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        debug!(path = ?path, rules = config.rules.len(), "Loaded engine config");
        Ok(config)
    }

    /// Load the file when given, otherwise defaults
    pub async fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.engine.max_concurrency == 0 {
            errors.push("engine.max_concurrency must be greater than 0".to_string());
        }
        if self.engine.article_timeout_secs == Some(0) {
            errors.push("engine.article_timeout_secs must be greater than 0".to_string());
        }
        for (id, table) in &self.rules {
            if table.is_empty() {
                errors.push(format!("rules.{} is empty", id));
            }
        }
        if !errors.is_empty() {
            bail!("Invalid configuration: {}", errors.join("; "));
        }
        Ok(())
    }

    /// Apply every `[rules.<id>]` table to the registry
    pub fn apply(&self, registry: &RuleRegistry) -> Result<()> {
        for (id, partial) in &self.rules {
            registry
                .apply_rule_config(id, partial)
                .with_context(|| format!("Failed to apply config for rule {}", id))?;
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_concurrency: self.engine.max_concurrency,
            article_timeout: self.engine.article_timeout_secs.map(Duration::from_secs),
            ..EngineSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleFilter;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[engine]
max_concurrency = 8
article_timeout_secs = 30

[rules.stale-content]
max_age_months = 6
critical_age_months = 9

[rules.seo]
enabled = false
"#;

    #[test]
    fn test_parse_sample() {
        let config = EngineConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.engine.max_concurrency, 8);
        assert_eq!(config.engine.article_timeout_secs, Some(30));
        assert_eq!(config.rules["stale-content"]["max_age_months"], json!(6));
        assert_eq!(config.rules["seo"]["enabled"], json!(false));

        let settings = config.engine_settings();
        assert_eq!(settings.max_concurrency, 8);
        assert_eq!(settings.article_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.engine.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let err = EngineConfig::from_toml("[engine]\nmax_concurrency = 0\narticle_timeout_secs = 0\n")
            .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("max_concurrency"));
        assert!(message.contains("article_timeout_secs"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(EngineConfig::from_toml("[engine]\nworkers = 2\n").is_err());
    }

    #[test]
    fn test_apply_to_registry() {
        let config = EngineConfig::from_toml(SAMPLE).unwrap();
        let registry = RuleRegistry::with_default_rules();
        config.apply(&registry).unwrap();

        let stale = registry.get_rule("stale-content").unwrap().config();
        assert_eq!(stale["max_age_months"], json!(6.0));
        assert_eq!(stale["critical_age_months"], json!(9.0));

        let enabled = RuleFilter {
            category: None,
            enabled: Some(true),
        };
        let ids: Vec<String> = registry.list_rules(&enabled).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["stale-content", "quality", "duplicate-content", "broken-links"]);
    }

    #[test]
    fn test_apply_unknown_rule_fails() {
        let config = EngineConfig::from_toml("[rules.spelling]\nenabled = false\n").unwrap();
        let err = config.apply(&RuleRegistry::with_default_rules()).unwrap_err();
        assert!(format!("{:#}", err).contains("rule not found: spelling"));
    }

    #[test]
    fn test_apply_invalid_rule_config_fails() {
        let config = EngineConfig::from_toml("[rules.quality]\nmin_word_count = \"few\"\n").unwrap();
        assert!(config.apply(&RuleRegistry::with_default_rules()).is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), SAMPLE).unwrap();

        let config = EngineConfig::load(file.path()).await.unwrap();
        assert_eq!(config.rules.len(), 2);

        let missing = EngineConfig::load(Path::new("/nonexistent/kbaudit.toml")).await;
        assert!(missing.is_err());
    }
}

use super::config::{RuleBase, RuleConfig, RuleDescriptor, RuleSettings};
use super::consolidate::{consolidate, Finding};
use super::{ExecutionContext, Rule};
use crate::report::{Issue, RuleCategory, RuleMetadata, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MAX_SUGGESTIONS: usize = 6;

static VERSION_REFERENCE: OnceLock<Regex> = OnceLock::new();

/// `version 2.3`, `v1.0`, `2.1 update`
fn version_reference() -> &'static Regex {
    VERSION_REFERENCE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:version\s+\d+(?:\.\d+)+|v\d+(?:\.\d+)+|\d+\.\d+\s+(?:update|release))\b")
            .expect("valid version pattern")
    })
}

/// Technologies whose mention marks an article as outdated
const OUTDATED_TECHNOLOGY: &[&str] = &[
    "internet explorer",
    "ie 11",
    "windows xp",
    "windows 7",
    "adobe flash",
    "flash player",
    "silverlight",
    "angularjs",
    "python 2",
    "jquery 1.",
    "http://",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StaleContentSettings {
    pub max_age_months: f64,
    pub critical_age_months: f64,
    /// Phrases that date an article, matched case-insensitively
    pub temporal_keywords: Vec<String>,
    pub check_version_references: bool,
    pub check_temporal_language: bool,
    pub check_outdated_technology: bool,
}

impl Default for StaleContentSettings {
    fn default() -> Self {
        Self {
            max_age_months: 12.0,
            critical_age_months: 18.0,
            temporal_keywords: [
                "currently",
                "recently",
                "last year",
                "this year",
                "next year",
                "coming soon",
                "new feature",
                "upcoming",
                "at the moment",
                "as of now",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            check_version_references: true,
            check_temporal_language: true,
            check_outdated_technology: true,
        }
    }
}

impl RuleSettings for StaleContentSettings {
    fn validate(&self) -> Result<(), String> {
        if !(self.max_age_months > 0.0) {
            return Err("max_age_months must be positive".to_string());
        }
        if !(self.critical_age_months > self.max_age_months) {
            return Err("critical_age_months must be greater than max_age_months".to_string());
        }
        if self.temporal_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err("temporal_keywords must not contain empty phrases".to_string());
        }
        Ok(())
    }
}

/// Flags articles that are old or read as dated
pub struct StaleContentRule {
    base: RuleBase<StaleContentSettings>,
}

impl Default for StaleContentRule {
    fn default() -> Self {
        Self::new(StaleContentSettings::default())
    }
}

impl StaleContentRule {
    pub fn new(settings: StaleContentSettings) -> Self {
        Self {
            base: RuleBase::new(
                RuleDescriptor {
                    id: "stale-content",
                    name: "Stale Content",
                    description: "Detects outdated articles by age, version references, temporal language and obsolete technology",
                    category: RuleCategory::ContentQuality,
                    severity: Severity::High,
                    configurable: true,
                    version: "1.0.0",
                    tags: &["freshness", "maintenance"],
                },
                settings,
            ),
        }
    }

    fn check_age(&self, ctx: &ExecutionContext<'_>, settings: &StaleContentSettings) -> Option<Finding> {
        let age_months = ctx.age_months();
        let rounded = (age_months * 10.0).round() / 10.0;

        let (severity, title) = if age_months > settings.critical_age_months {
            (Severity::Critical, "Content is critically outdated")
        } else if age_months > settings.max_age_months {
            (Severity::High, "Content may be outdated")
        } else {
            return None;
        };

        let mut suggestions = vec![
            "Review the article for accuracy against the current product".to_string(),
            "Update screenshots, steps and examples that have changed".to_string(),
        ];
        if severity == Severity::Critical {
            suggestions.insert(0, "Prioritize a full rewrite or archive the article".to_string());
        }

        Some(
            Finding::new(
                severity,
                title,
                format!(
                    "Last modified {} months ago (threshold {} months)",
                    rounded, settings.max_age_months
                ),
            )
            .with_suggestions(suggestions)
            .with_detail("age_months", rounded)
            .with_detail("age_days", ctx.metadata.age_days),
        )
    }

    fn check_version_references(&self, content: &str) -> Option<Finding> {
        let mut matches: Vec<String> = Vec::new();
        for m in version_reference().find_iter(content) {
            let fragment = m.as_str().to_string();
            if !matches.contains(&fragment) {
                matches.push(fragment);
            }
        }
        if matches.is_empty() {
            return None;
        }
        matches.truncate(3);

        Some(
            Finding::new(
                Severity::Medium,
                "References specific versions",
                format!("Mentions versions that may be superseded: {}", matches.join(", ")),
            )
            .with_suggestions([
                "Confirm referenced versions are still current",
                "Prefer version-neutral wording where possible",
            ])
            .with_detail("version_references", matches),
        )
    }

    fn check_temporal_language(&self, content: &str, settings: &StaleContentSettings) -> Option<Finding> {
        let lower = content.to_lowercase();
        let found: Vec<String> = settings
            .temporal_keywords
            .iter()
            .filter(|k| lower.contains(&k.to_lowercase()))
            .take(5)
            .cloned()
            .collect();
        if found.is_empty() {
            return None;
        }

        Some(
            Finding::new(
                Severity::Medium,
                "Uses time-sensitive language",
                format!("Contains phrases that date the article: {}", found.join(", ")),
            )
            .with_suggestions([
                "Replace relative time references with specific dates",
                "Remove announcements of features that have since shipped",
            ])
            .with_detail("temporal_keywords", found),
        )
    }

    fn check_outdated_technology(&self, content: &str) -> Option<Finding> {
        let lower = content.to_lowercase();
        let found: Vec<&str> = OUTDATED_TECHNOLOGY
            .iter()
            .copied()
            .filter(|t| lower.contains(t))
            .take(3)
            .collect();
        if found.is_empty() {
            return None;
        }

        Some(
            Finding::new(
                Severity::High,
                "References outdated technology",
                format!("Mentions deprecated or insecure technology: {}", found.join(", ")),
            )
            .with_suggestions([
                "Replace references to deprecated technology with current alternatives",
                "Switch insecure http:// links to https://",
            ])
            .with_detail("outdated_technology", found),
        )
    }
}

impl Rule for StaleContentRule {
    fn id(&self) -> &'static str {
        self.base.id()
    }

    fn metadata(&self) -> RuleMetadata {
        self.base.metadata()
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> anyhow::Result<Option<Issue>> {
        let settings = self.base.settings();
        let content = ctx.content();

        let mut findings = Vec::new();
        findings.extend(self.check_age(ctx, &settings));
        if settings.check_version_references {
            findings.extend(self.check_version_references(content));
        }
        if settings.check_temporal_language {
            findings.extend(self.check_temporal_language(content, &settings));
        }
        if settings.check_outdated_technology {
            findings.extend(self.check_outdated_technology(content));
        }

        let d = self.base.descriptor();
        Ok(consolidate(d.id, d.category, findings, MAX_SUGGESTIONS))
    }

    fn check_config(&self, partial: &RuleConfig) -> Result<(), String> {
        self.base.check_config(partial)
    }

    fn update_config(&self, partial: &RuleConfig) -> bool {
        self.base.update_config(partial)
    }

    fn config(&self) -> RuleConfig {
        self.base.config()
    }

    fn set_enabled(&self, enabled: bool) {
        self.base.set_enabled(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Article;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn article(content: &str, age_days: i64) -> Article {
        Article {
            id: "kb-1".to_string(),
            title: "Configuring single sign-on".to_string(),
            content: content.to_string(),
            tags: vec![],
            category: "auth".to_string(),
            last_modified: now() - Duration::days(age_days),
            description: None,
        }
    }

    fn run(rule: &StaleContentRule, content: &str, age_days: i64) -> Option<Issue> {
        let a = article(content, age_days);
        let ctx = ExecutionContext::build(&a, now());
        rule.execute(&ctx).unwrap()
    }

    #[test]
    fn test_fresh_clean_article_passes() {
        let rule = StaleContentRule::default();
        assert!(run(&rule, "Open settings and choose a provider.", 30).is_none());
    }

    #[test]
    fn test_age_high() {
        let rule = StaleContentRule::default();
        // 400 days = 13.3 months
        let issue = run(&rule, "Plain body.", 400).unwrap();
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.title, "Content may be outdated");
    }

    #[test]
    fn test_age_critical() {
        let rule = StaleContentRule::default();
        // 600 days = 20 months
        let issue = run(&rule, "Plain body.", 600).unwrap();
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.metadata["age_months"], json!(20.0));
    }

    #[test]
    fn test_age_at_threshold_is_not_flagged() {
        let rule = StaleContentRule::default();
        // exactly 12 months is not > 12
        assert!(run(&rule, "Plain body.", 360).is_none());
    }

    #[test]
    fn test_critical_for_every_age_past_threshold() {
        let rule = StaleContentRule::default();
        for days in [541, 600, 900, 3650] {
            let issue = run(&rule, "currently v1.0 on windows xp", days).unwrap();
            assert_eq!(issue.severity, Severity::Critical, "age {} days", days);
        }
    }

    #[test]
    fn test_version_references() {
        let rule = StaleContentRule::default();
        let issue = run(
            &rule,
            "Install version 2.3 first. Then v1.0 and v1.1, after the 2.1 update and v4.2.",
            10,
        )
        .unwrap();
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.title, "References specific versions");
        assert_eq!(
            issue.metadata["version_references"],
            json!(["version 2.3", "v1.0", "v1.1"])
        );
    }

    #[test]
    fn test_temporal_language() {
        let rule = StaleContentRule::default();
        let issue = run(&rule, "This is Currently in beta and Coming Soon to all plans.", 10).unwrap();
        assert_eq!(issue.title, "Uses time-sensitive language");
        assert_eq!(
            issue.metadata["temporal_keywords"],
            json!(["currently", "coming soon"])
        );
    }

    #[test]
    fn test_outdated_technology_outranks_medium_findings() {
        let rule = StaleContentRule::default();
        let issue = run(&rule, "Currently works in Internet Explorer.", 10).unwrap();
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.title, "References outdated technology");
        assert_eq!(issue.metadata["total_issues_found"], json!(2));
        assert!(issue.suggestions.len() <= MAX_SUGGESTIONS);
        assert!(issue
            .suggestions
            .iter()
            .any(|s| s.contains("relative time references")));
    }

    #[test]
    fn test_suggestions_capped() {
        let rule = StaleContentRule::default();
        let issue = run(&rule, "Currently v1.0 on Windows XP via http://x.io", 700).unwrap();
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.metadata["total_issues_found"], json!(4));
        assert_eq!(issue.suggestions.len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn test_checks_can_be_disabled() {
        let rule = StaleContentRule::default();
        let partial = json!({
            "check_version_references": false,
            "check_temporal_language": false,
            "check_outdated_technology": false
        });
        assert!(rule.update_config(partial.as_object().unwrap()));
        assert!(run(&rule, "Currently v1.0 on Windows XP", 10).is_none());
    }

    #[test]
    fn test_config_rejects_inverted_thresholds() {
        let rule = StaleContentRule::default();
        let partial = json!({"max_age_months": 24.0});
        assert!(!rule.validate_config(partial.as_object().unwrap()));
        assert!(!rule.update_config(partial.as_object().unwrap()));
    }

    #[test]
    fn test_execute_is_idempotent() {
        let rule = StaleContentRule::default();
        let a = article("Currently v2.0 and http://old.example.com", 450);
        let ctx = ExecutionContext::build(&a, now());
        assert_eq!(rule.execute(&ctx).unwrap(), rule.execute(&ctx).unwrap());
    }
}

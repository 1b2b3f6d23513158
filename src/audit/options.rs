use crate::report::{RuleMetadata, Severity};

/// Per-request selection of which enabled rules run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOptions {
    /// Rule id allowlist; `None` or empty runs every enabled rule
    pub rules: Option<Vec<String>>,
    /// Skip rules whose default severity ranks below this
    pub min_severity: Option<Severity>,
}

impl AuditOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = Some(rules.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Whether a rule with this metadata should run under these options
    pub fn selects(&self, rule: &RuleMetadata) -> bool {
        let allowed = match &self.rules {
            Some(ids) if !ids.is_empty() => ids.iter().any(|id| *id == rule.id),
            _ => true,
        };
        allowed && self.min_severity.map_or(true, |min| rule.severity >= min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RuleCategory;

    fn rule(id: &str, severity: Severity) -> RuleMetadata {
        RuleMetadata {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            category: RuleCategory::ContentQuality,
            severity,
            enabled: true,
            configurable: true,
            version: "1.0.0".to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn test_default_selects_everything() {
        let options = AuditOptions::new();
        assert!(options.selects(&rule("seo", Severity::Low)));
        assert!(options.selects(&rule("stale-content", Severity::High)));
    }

    #[test]
    fn test_empty_allowlist_selects_everything() {
        let options = AuditOptions::new().with_rules(Vec::<String>::new());
        assert!(options.selects(&rule("seo", Severity::Low)));
    }

    #[test]
    fn test_allowlist() {
        let options = AuditOptions::new().with_rules(["quality", "seo"]);
        assert!(options.selects(&rule("seo", Severity::Low)));
        assert!(!options.selects(&rule("broken-links", Severity::High)));
    }

    #[test]
    fn test_min_severity() {
        let options = AuditOptions::new().with_min_severity(Severity::Medium);
        assert!(options.selects(&rule("quality", Severity::Medium)));
        assert!(options.selects(&rule("broken-links", Severity::High)));
        assert!(!options.selects(&rule("seo", Severity::Low)));
    }

    #[test]
    fn test_allowlist_and_severity_combine() {
        let options = AuditOptions::new()
            .with_rules(["seo", "broken-links"])
            .with_min_severity(Severity::High);
        assert!(!options.selects(&rule("seo", Severity::Low)));
        assert!(options.selects(&rule("broken-links", Severity::High)));
        assert!(!options.selects(&rule("stale-content", Severity::High)));
    }
}

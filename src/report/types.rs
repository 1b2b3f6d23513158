use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Ordinal defect importance, ordered `Info < Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

/// Area of article health a rule covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    ContentQuality,
    Technical,
    Seo,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 3] = [
        RuleCategory::ContentQuality,
        RuleCategory::Technical,
        RuleCategory::Seo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::ContentQuality => "content-quality",
            RuleCategory::Technical => "technical",
            RuleCategory::Seo => "seo",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown rule category '{}'", s))
    }
}

/// Descriptive metadata for a registered rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub enabled: bool,
    pub configurable: bool,
    pub version: String,
    pub tags: Vec<String>,
}

/// The single consolidated finding one rule reports for one article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub rule_id: String,
    pub category: RuleCategory,
    #[serde(rename = "issue")]
    pub title: String,
    pub description: String,
    /// Ordered remediation steps
    pub suggestions: Vec<String>,
    pub severity: Severity,
    /// Rule-specific details
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Outcome of one rule on one article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleResult {
    pub rule_id: String,
    pub rule_name: String,
    pub passed: bool,
    pub issues_count: usize,
    pub execution_time_ms: f64,
}

/// A rule that failed while executing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionError {
    pub rule_id: String,
    pub rule_name: String,
    pub message: String,
}

/// Result of auditing one article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditResult {
    pub article_id: String,
    pub article_title: String,
    pub total_rules_executed: usize,
    pub issues_found: usize,
    pub issues: Vec<Issue>,
    pub rule_results: Vec<RuleResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_errors: Vec<ExecutionError>,
    pub execution_time_ms: f64,
    pub content_health_score: u8,
}

/// How often an issue title occurred across a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueFrequency {
    pub issue: String,
    pub count: usize,
}

/// Aggregate statistics over a batch of audit results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchAuditSummary {
    pub total_articles: usize,
    pub total_issues: usize,
    pub articles_with_issues: usize,
    pub average_issues_per_article: f64,
    pub severity_breakdown: BTreeMap<Severity, usize>,
    pub category_breakdown: BTreeMap<RuleCategory, usize>,
    pub most_common_issues: Vec<IssueFrequency>,
}

/// An article the batch could not audit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleFailure {
    pub article_id: String,
    pub error: String,
}

/// Results of a batch audit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchAudit {
    pub results: Vec<AuditResult>,
    pub summary: BatchAuditSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ArticleFailure>,
}

/// Audit report written to disk
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditReport {
    pub report_version: String,
    pub report_id: String,
    pub generated_at: String,
    pub results: Vec<AuditResult>,
    pub summary: BatchAuditSummary,
    pub failures: Vec<ArticleFailure>,
}

impl AuditReport {
    pub fn new(batch: BatchAudit) -> Self {
        Self {
            report_version: "1.0.0".to_string(),
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            results: batch.results,
            summary: batch.summary,
            failures: batch.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_issue() -> Issue {
        let mut metadata = Map::new();
        metadata.insert("age_months".to_string(), Value::from(20));
        Issue {
            rule_id: "stale-content".to_string(),
            category: RuleCategory::ContentQuality,
            title: "Content is critically outdated".to_string(),
            description: "Last updated 20 months ago".to_string(),
            suggestions: vec!["Review the article".to_string()],
            severity: Severity::Critical,
            metadata,
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(serde_json::to_string(&Severity::Info).unwrap(), "\"info\"");
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!(" low ".parse::<Severity>().unwrap(), Severity::Low);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&RuleCategory::ContentQuality).unwrap(),
            "\"content-quality\""
        );
        assert_eq!(serde_json::to_string(&RuleCategory::Seo).unwrap(), "\"seo\"");
        assert_eq!(
            "technical".parse::<RuleCategory>().unwrap(),
            RuleCategory::Technical
        );
    }

    #[test]
    fn test_issue_title_serialized_as_issue() {
        let json = serde_json::to_string(&sample_issue()).unwrap();
        assert!(json.contains("\"issue\":\"Content is critically outdated\""));
        assert!(json.contains("\"severity\":\"critical\""));

        let parsed: Issue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample_issue());
    }

    #[test]
    fn test_breakdown_keys_serialize_as_strings() {
        let mut severity_breakdown = BTreeMap::new();
        severity_breakdown.insert(Severity::High, 2);
        let summary = BatchAuditSummary {
            total_articles: 1,
            total_issues: 2,
            articles_with_issues: 1,
            average_issues_per_article: 2.0,
            severity_breakdown,
            category_breakdown: BTreeMap::new(),
            most_common_issues: vec![],
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"high\":2"));
    }

    #[test]
    fn test_report_wraps_batch() {
        let batch = BatchAudit {
            results: vec![],
            summary: BatchAuditSummary {
                total_articles: 0,
                total_issues: 0,
                articles_with_issues: 0,
                average_issues_per_article: 0.0,
                severity_breakdown: BTreeMap::new(),
                category_breakdown: BTreeMap::new(),
                most_common_issues: vec![],
            },
            failures: vec![],
        };
        let report = AuditReport::new(batch);

        assert_eq!(report.report_version, "1.0.0");
        assert!(!report.report_id.is_empty());
        assert!(report.generated_at.contains('T'));
    }
}

use crate::report::{Issue, RuleCategory, Severity};
use serde_json::{json, Map, Value};

/// One sub-problem detected by a rule before consolidation
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub suggestions: Vec<String>,
    pub details: Map<String, Value>,
}

impl Finding {
    pub fn new(severity: Severity, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            suggestions: Vec::new(),
            details: Map::new(),
        }
    }

    pub fn with_suggestions<I, T>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Merge a rule's findings into the single issue it reports.
///
/// The most severe finding (first one on ties) supplies title, description,
/// severity and details. Suggestions from all findings are merged in severity
/// order, deduplicated and capped at `max_suggestions`. Metadata records
/// `total_issues_found` and a `sub_issues` list.
pub fn consolidate(
    rule_id: &str,
    category: RuleCategory,
    mut findings: Vec<Finding>,
    max_suggestions: usize,
) -> Option<Issue> {
    if findings.is_empty() {
        return None;
    }
    // stable: equal severities keep detection order
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));

    let mut suggestions: Vec<String> = Vec::new();
    for suggestion in findings.iter().flat_map(|f| f.suggestions.iter()) {
        if suggestions.len() >= max_suggestions {
            break;
        }
        if !suggestions.contains(suggestion) {
            suggestions.push(suggestion.clone());
        }
    }

    let sub_issues: Vec<Value> = findings
        .iter()
        .map(|f| json!({ "issue": f.title, "severity": f.severity }))
        .collect();
    let total = findings.len();

    let top = findings.swap_remove(0);
    let mut metadata = top.details;
    metadata.insert("total_issues_found".to_string(), Value::from(total));
    metadata.insert("sub_issues".to_string(), Value::Array(sub_issues));

    Some(Issue {
        rule_id: rule_id.to_string(),
        category,
        title: top.title,
        description: top.description,
        suggestions,
        severity: top.severity,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn finding(severity: Severity, title: &str, suggestions: &[&str]) -> Finding {
        Finding::new(severity, title, format!("{} description", title))
            .with_suggestions(suggestions.iter().copied())
    }

    #[test]
    fn test_consolidate_empty_is_none() {
        assert!(consolidate("r", RuleCategory::Seo, vec![], 5).is_none());
    }

    #[test]
    fn test_consolidate_picks_highest_severity() {
        let issue = consolidate(
            "r",
            RuleCategory::ContentQuality,
            vec![
                finding(Severity::Medium, "medium one", &["m"]),
                finding(Severity::Critical, "critical one", &["c"]),
                finding(Severity::Low, "low one", &["l"]),
            ],
            6,
        )
        .unwrap();

        assert_eq!(issue.title, "critical one");
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.suggestions, vec!["c", "m", "l"]);
        assert_eq!(issue.metadata["total_issues_found"], json!(3));
        assert_eq!(issue.metadata["sub_issues"][0]["issue"], json!("critical one"));
        assert_eq!(issue.metadata["sub_issues"][2]["severity"], json!("low"));
    }

    #[test]
    fn test_consolidate_ties_keep_detection_order() {
        let issue = consolidate(
            "r",
            RuleCategory::Seo,
            vec![
                finding(Severity::High, "first high", &[]),
                finding(Severity::High, "second high", &[]),
            ],
            6,
        )
        .unwrap();
        assert_eq!(issue.title, "first high");
    }

    #[test]
    fn test_consolidate_dedups_and_caps_suggestions() {
        let issue = consolidate(
            "r",
            RuleCategory::Technical,
            vec![
                finding(Severity::High, "a", &["one", "two", "three"]),
                finding(Severity::Medium, "b", &["two", "four", "five", "six"]),
            ],
            4,
        )
        .unwrap();
        assert_eq!(issue.suggestions, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_consolidate_keeps_top_details() {
        let top = finding(Severity::High, "top", &[]).with_detail("age_months", 20);
        let other = finding(Severity::Low, "other", &[]).with_detail("ignored", true);
        let issue = consolidate("r", RuleCategory::ContentQuality, vec![other, top], 6).unwrap();

        assert_eq!(issue.metadata["age_months"], json!(20));
        assert!(!issue.metadata.contains_key("ignored"));
        assert_eq!(issue.rule_id, "r");
    }
}

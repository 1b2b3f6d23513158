use super::types::*;
use std::collections::{BTreeMap, HashMap};

const MOST_COMMON_LIMIT: usize = 10;

/// Fold per-article results into batch statistics
pub fn summarize(results: &[AuditResult]) -> BatchAuditSummary {
    let mut severity_breakdown: BTreeMap<Severity, usize> =
        Severity::ALL.into_iter().map(|s| (s, 0)).collect();
    let mut category_breakdown: BTreeMap<RuleCategory, usize> =
        RuleCategory::ALL.into_iter().map(|c| (c, 0)).collect();
    let mut frequency: HashMap<&str, usize> = HashMap::new();

    let mut total_issues = 0;
    let mut articles_with_issues = 0;

    for result in results {
        total_issues += result.issues_found;
        if result.issues_found > 0 {
            articles_with_issues += 1;
        }
        for issue in &result.issues {
            *severity_breakdown.entry(issue.severity).or_default() += 1;
            *category_breakdown.entry(issue.category).or_default() += 1;
            *frequency.entry(issue.title.as_str()).or_default() += 1;
        }
    }

    let mut most_common_issues: Vec<IssueFrequency> = frequency
        .into_iter()
        .map(|(issue, count)| IssueFrequency {
            issue: issue.to_string(),
            count,
        })
        .collect();
    most_common_issues.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.issue.cmp(&b.issue)));
    most_common_issues.truncate(MOST_COMMON_LIMIT);

    let average_issues_per_article = if results.is_empty() {
        0.0
    } else {
        total_issues as f64 / results.len() as f64
    };

    BatchAuditSummary {
        total_articles: results.len(),
        total_issues,
        articles_with_issues,
        average_issues_per_article,
        severity_breakdown,
        category_breakdown,
        most_common_issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    fn issue(title: &str, severity: Severity, category: RuleCategory) -> Issue {
        Issue {
            rule_id: "r".to_string(),
            category,
            title: title.to_string(),
            description: String::new(),
            suggestions: vec![],
            severity,
            metadata: Map::new(),
        }
    }

    fn result(id: &str, issues: Vec<Issue>) -> AuditResult {
        AuditResult {
            article_id: id.to_string(),
            article_title: id.to_string(),
            total_rules_executed: 5,
            issues_found: issues.len(),
            issues,
            rule_results: vec![],
            execution_errors: vec![],
            execution_time_ms: 0.0,
            content_health_score: 100,
        }
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);

        assert_eq!(summary.total_articles, 0);
        assert_eq!(summary.total_issues, 0);
        assert_eq!(summary.articles_with_issues, 0);
        assert_eq!(summary.average_issues_per_article, 0.0);
        assert!(summary.severity_breakdown.values().all(|&c| c == 0));
        assert!(summary.category_breakdown.values().all(|&c| c == 0));
        assert!(summary.most_common_issues.is_empty());
    }

    #[test]
    fn test_summarize_breakdowns() {
        let results = vec![
            result(
                "a",
                vec![
                    issue("Outdated", Severity::Critical, RuleCategory::ContentQuality),
                    issue("Broken links", Severity::High, RuleCategory::Technical),
                ],
            ),
            result(
                "b",
                vec![issue("Outdated", Severity::High, RuleCategory::ContentQuality)],
            ),
            result("c", vec![]),
        ];

        let summary = summarize(&results);

        assert_eq!(summary.total_articles, 3);
        assert_eq!(summary.total_issues, 3);
        assert_eq!(summary.articles_with_issues, 2);
        assert_eq!(summary.average_issues_per_article, 1.0);
        assert_eq!(summary.severity_breakdown[&Severity::Critical], 1);
        assert_eq!(summary.severity_breakdown[&Severity::High], 2);
        assert_eq!(summary.severity_breakdown[&Severity::Low], 0);
        assert_eq!(summary.category_breakdown[&RuleCategory::ContentQuality], 2);
        assert_eq!(summary.category_breakdown[&RuleCategory::Technical], 1);
        assert_eq!(
            summary.most_common_issues,
            vec![
                IssueFrequency {
                    issue: "Outdated".to_string(),
                    count: 2
                },
                IssueFrequency {
                    issue: "Broken links".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_average_is_exact_ratio() {
        let results = vec![
            result("a", vec![issue("x", Severity::Low, RuleCategory::Seo)]),
            result("b", vec![]),
            result("c", vec![]),
        ];
        let summary = summarize(&results);
        assert!((summary.average_issues_per_article - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_most_common_ties_sorted_by_title() {
        let results = vec![result(
            "a",
            vec![
                issue("Zeta", Severity::Low, RuleCategory::Seo),
                issue("Alpha", Severity::Low, RuleCategory::Seo),
            ],
        )];
        let summary = summarize(&results);
        assert_eq!(summary.most_common_issues[0].issue, "Alpha");
        assert_eq!(summary.most_common_issues[1].issue, "Zeta");
    }
}

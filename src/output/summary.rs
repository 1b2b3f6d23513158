use crate::audit::EngineStats;
use crate::report::{AuditReport, RuleMetadata, Severity};
use crate::rules::text::truncate;
use std::fmt::Write;
use std::path::Path;

/// Print human-readable summary to stdout
pub fn print_summary(report: &AuditReport, output_path: Option<&Path>) {
    println!();
    println!("╭───────────────────────────────────────────────────────────────╮");
    println!("│                  KB Audit Report Summary                      │");
    println!("╰───────────────────────────────────────────────────────────────╯");
    println!();
    print!("{}", format_summary(report));

    if let Some(path) = output_path {
        println!();
        println!("Full report written to: {}", path.display());
    }
    println!();
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🚨",
        Severity::High => "❗",
        Severity::Medium => "⚠️ ",
        Severity::Low => "🔹",
        Severity::Info => "ℹ️ ",
    }
}

/// Format summary as string
pub fn format_summary(report: &AuditReport) -> String {
    let summary = &report.summary;
    let mut output = String::new();

    let _ = writeln!(output, "Generated: {}", report.generated_at);
    let _ = writeln!(
        output,
        "Articles: {} audited, {} with issues, {} failed",
        summary.total_articles,
        summary.articles_with_issues,
        report.failures.len()
    );
    let _ = writeln!(
        output,
        "Issues: {} total, {:.2} per article",
        summary.total_issues, summary.average_issues_per_article
    );

    let severities: Vec<String> = summary
        .severity_breakdown
        .iter()
        .rev()
        .filter(|(_, count)| **count > 0)
        .map(|(severity, count)| format!("{} {}", count, severity))
        .collect();
    if !severities.is_empty() {
        let _ = writeln!(output, "By severity: {}", severities.join(", "));
    }

    if !report.results.is_empty() {
        output.push('\n');
        for result in &report.results {
            let _ = writeln!(
                output,
                "{} ({}) score {}/100, {} issue(s)",
                truncate(&result.article_title, 50),
                result.article_id,
                result.content_health_score,
                result.issues_found
            );
            for issue in &result.issues {
                let _ = writeln!(
                    output,
                    "  {} [{}] {}: {}",
                    severity_icon(issue.severity),
                    issue.severity,
                    issue.rule_id,
                    issue.title
                );
            }
            for error in &result.execution_errors {
                let _ = writeln!(output, "  ✖ [error] {}: {}", error.rule_id, error.message);
            }
        }
    }

    if !summary.most_common_issues.is_empty() {
        output.push('\n');
        output.push_str("Most common issues:\n");
        for (i, freq) in summary.most_common_issues.iter().enumerate() {
            let _ = writeln!(output, "  {}. {} ({})", i + 1, freq.issue, freq.count);
        }
    }

    if !report.failures.is_empty() {
        output.push('\n');
        output.push_str("Failed articles:\n");
        for failure in &report.failures {
            let _ = writeln!(output, "  {}: {}", failure.article_id, failure.error);
        }
    }

    output
}

/// Format the rule listing as an aligned table
pub fn format_rules(rules: &[RuleMetadata]) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<20} {:<16} {:<9} {:<8} NAME",
        "ID", "CATEGORY", "SEVERITY", "ENABLED"
    );
    for rule in rules {
        let _ = writeln!(
            output,
            "{:<20} {:<16} {:<9} {:<8} {}",
            rule.id,
            rule.category.as_str(),
            rule.severity.as_str(),
            if rule.enabled { "yes" } else { "no" },
            rule.name
        );
    }
    output
}

pub fn format_stats(stats: &EngineStats) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Rules: {} registered, {} enabled",
        stats.total_rules, stats.enabled_rules
    );
    for (category, count) in &stats.rule_categories {
        let _ = writeln!(output, "  {}: {}", category, count);
    }
    match &stats.sample_audit {
        Some(sample) => {
            let _ = writeln!(
                output,
                "Sample audit: {} scored {}/100 with {} issue(s)",
                sample.article_id, sample.content_health_score, sample.issues_found
            );
        }
        None => output.push_str("Sample audit: no articles available\n"),
    }
    output
}

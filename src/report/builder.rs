use super::types::*;
use std::time::{Duration, Instant};

const MIN_HEALTH_SCORE: f64 = 40.0;
const NO_RULES_HEALTH_SCORE: u8 = 75;

/// Content health on a 40..=100 scale from the share of rules that found problems
pub fn content_health_score(issues_found: usize, total_rules_executed: usize) -> u8 {
    if total_rules_executed == 0 {
        return NO_RULES_HEALTH_SCORE;
    }
    let ratio = issues_found as f64 / total_rules_executed as f64;
    let score = (100.0 - ratio * 60.0).round().max(MIN_HEALTH_SCORE);
    score.min(100.0) as u8
}

/// Accumulates rule outcomes for one article into an `AuditResult`
pub struct AuditResultBuilder {
    article_id: String,
    article_title: String,
    issues: Vec<Issue>,
    rule_results: Vec<RuleResult>,
    execution_errors: Vec<ExecutionError>,
    started: Instant,
}

impl AuditResultBuilder {
    /// Start a result for an article; execution time is measured from here
    pub fn new(article_id: &str, article_title: &str) -> Self {
        Self {
            article_id: article_id.to_string(),
            article_title: article_title.to_string(),
            issues: Vec::new(),
            rule_results: Vec::new(),
            execution_errors: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Record a rule that ran and found nothing
    pub fn record_pass(&mut self, rule: &RuleMetadata, elapsed: Duration) -> &mut Self {
        self.rule_results.push(RuleResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            passed: true,
            issues_count: 0,
            execution_time_ms: millis(elapsed),
        });
        self
    }

    /// Record a rule that ran and reported an issue
    pub fn record_issue(&mut self, rule: &RuleMetadata, issue: Issue, elapsed: Duration) -> &mut Self {
        self.rule_results.push(RuleResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            passed: false,
            issues_count: 1,
            execution_time_ms: millis(elapsed),
        });
        self.issues.push(issue);
        self
    }

    /// Record a rule that failed to execute: a failed rule result with no issue,
    /// plus an entry in the execution errors
    pub fn record_failure(
        &mut self,
        rule: &RuleMetadata,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> &mut Self {
        self.rule_results.push(RuleResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            passed: false,
            issues_count: 0,
            execution_time_ms: millis(elapsed),
        });
        self.execution_errors.push(ExecutionError {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            message: message.into(),
        });
        self
    }

    /// Build the final result
    pub fn build(self) -> AuditResult {
        let total_rules_executed = self.rule_results.len();
        let issues_found = self.issues.len();

        AuditResult {
            article_id: self.article_id,
            article_title: self.article_title,
            total_rules_executed,
            issues_found,
            issues: self.issues,
            rule_results: self.rule_results,
            execution_errors: self.execution_errors,
            execution_time_ms: millis(self.started.elapsed()),
            content_health_score: content_health_score(issues_found, total_rules_executed),
        }
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

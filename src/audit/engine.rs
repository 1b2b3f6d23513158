use super::AuditOptions;
use crate::error::{AuditError, Result};
use crate::report::{
    summarize, ArticleFailure, AuditResult, AuditResultBuilder, BatchAudit, RuleCategory,
    RuleMetadata,
};
use crate::rules::{ExecutionContext, RuleConfig, RuleFilter, RuleRegistry};
use crate::store::{Article, ArticleFilter, ArticleStore};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Runtime knobs of the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Maximum number of articles audited at once in a batch
    pub max_concurrency: usize,
    /// Deadline for one article's audit; exceeded audits become batch failures
    pub article_timeout: Option<Duration>,
    /// Fixed "now" used for article age; `None` uses the wall clock
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            article_timeout: None,
            reference_time: None,
        }
    }
}

/// Registry overview returned by `AuditEngine::get_stats`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EngineStats {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub rule_categories: BTreeMap<RuleCategory, usize>,
    /// Audit of the first article in the store, if any
    pub sample_audit: Option<AuditResult>,
}

/// Runs registered rules over articles and aggregates the results.
///
/// Cheap to clone: the registry and store are shared.
#[derive(Clone)]
pub struct AuditEngine {
    registry: Arc<RuleRegistry>,
    store: Arc<dyn ArticleStore>,
    settings: EngineSettings,
}

impl AuditEngine {
    pub fn new(registry: RuleRegistry, store: Arc<dyn ArticleStore>) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn now(&self) -> DateTime<Utc> {
        self.settings.reference_time.unwrap_or_else(Utc::now)
    }

    pub fn list_rules(&self, filter: &RuleFilter) -> Vec<RuleMetadata> {
        self.registry.list_rules(filter)
    }

    pub fn get_rule(&self, id: &str) -> Result<RuleMetadata> {
        self.registry
            .get_rule(id)
            .map(|rule| rule.metadata())
            .ok_or_else(|| AuditError::RuleNotFound { id: id.to_string() })
    }

    /// Apply a partial configuration to a rule, `enabled` included
    pub fn update_rule_config(&self, id: &str, partial: &RuleConfig) -> Result<()> {
        self.registry.apply_rule_config(id, partial)
    }

    /// Audit one article synchronously on the calling thread.
    ///
    /// A rule that returns an error or panics is recorded in
    /// `execution_errors` and the remaining rules still run.
    pub fn audit(&self, article: &Article, options: &AuditOptions) -> AuditResult {
        let ctx = ExecutionContext::build(article, self.now());
        let mut builder = AuditResultBuilder::new(&article.id, &article.title);

        for rule in self.registry.enabled_rules() {
            let metadata = rule.metadata();
            if !options.selects(&metadata) {
                continue;
            }

            let started = Instant::now();
            match panic::catch_unwind(AssertUnwindSafe(|| rule.execute(&ctx))) {
                Ok(Ok(Some(issue))) => {
                    builder.record_issue(&metadata, issue, started.elapsed());
                }
                Ok(Ok(None)) => {
                    builder.record_pass(&metadata, started.elapsed());
                }
                Ok(Err(e)) => {
                    warn!(rule_id = %metadata.id, article_id = %article.id, error = %e, "Rule execution failed");
                    builder.record_failure(&metadata, format!("{:#}", e), started.elapsed());
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(rule_id = %metadata.id, article_id = %article.id, error = %message, "Rule panicked");
                    builder.record_failure(
                        &metadata,
                        format!("rule panicked: {}", message),
                        started.elapsed(),
                    );
                }
            }
        }

        let result = builder.build();
        debug!(
            article_id = %result.article_id,
            issues = result.issues_found,
            score = result.content_health_score,
            "Audited article"
        );
        result
    }

    /// Audit an article on the blocking pool, bounded by the article deadline
    async fn audit_owned(&self, article: Article, options: AuditOptions) -> Result<AuditResult> {
        let engine = self.clone();
        let article_id = article.id.clone();
        let task = tokio::task::spawn_blocking(move || engine.audit(&article, &options));

        let joined = match self.settings.article_timeout {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                AuditError::Timeout {
                    article_id,
                    secs: limit.as_secs(),
                }
            })?,
            None => task.await,
        };
        joined.map_err(|e| AuditError::Task(e.to_string()))
    }

    /// Fetch an article from the store and audit it
    pub async fn audit_article(&self, id: &str, options: &AuditOptions) -> Result<AuditResult> {
        let article = self.store.get_article(id).await?;
        self.audit_owned(article, options.clone()).await
    }

    /// Audit articles by id. Missing articles and timeouts become failures;
    /// results keep the order of `ids`.
    pub async fn audit_articles(&self, ids: &[String], options: &AuditOptions) -> BatchAudit {
        let outcomes = stream::iter(ids)
            .map(|id| async move { (id.clone(), self.audit_article(id, options).await) })
            .buffered(self.settings.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        self.finish_batch(outcomes)
    }

    /// Audit articles that are already loaded, in order
    pub async fn audit_batch(&self, articles: Vec<Article>, options: &AuditOptions) -> BatchAudit {
        let outcomes = stream::iter(articles)
            .map(|article| async move {
                let id = article.id.clone();
                (id, self.audit_owned(article, options.clone()).await)
            })
            .buffered(self.settings.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        self.finish_batch(outcomes)
    }

    fn finish_batch(&self, outcomes: Vec<(String, Result<AuditResult>)>) -> BatchAudit {
        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (article_id, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(article_id = %article_id, error = %e, "Article audit failed");
                    failures.push(ArticleFailure {
                        article_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = summarize(&results);
        info!(
            articles = summary.total_articles,
            failures = failures.len(),
            issues = summary.total_issues,
            "Batch audit complete"
        );
        BatchAudit {
            results,
            summary,
            failures,
        }
    }

    /// Rule counts plus an audit of the first stored article
    pub async fn get_stats(&self) -> Result<EngineStats> {
        let rules = self.registry.list_rules(&RuleFilter::default());
        let mut rule_categories: BTreeMap<RuleCategory, usize> =
            RuleCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for rule in &rules {
            *rule_categories.entry(rule.category).or_insert(0) += 1;
        }

        let first = ArticleFilter {
            limit: Some(1),
            ..ArticleFilter::default()
        };
        let sample_audit = match self.store.list_articles(&first).await?.into_iter().next() {
            Some(article) => Some(self.audit_owned(article, AuditOptions::default()).await?),
            None => None,
        };

        Ok(EngineStats {
            total_rules: rules.len(),
            enabled_rules: rules.iter().filter(|r| r.enabled).count(),
            rule_categories,
            sample_audit,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

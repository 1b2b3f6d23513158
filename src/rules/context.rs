use crate::store::Article;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Analysis metadata derived once per article
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContextMetadata {
    pub word_count: usize,
    /// Content length in characters
    pub content_length: usize,
    /// Whole days since the article was last modified, never negative
    pub age_days: i64,
}

/// Context passed to rules for evaluation
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub article: &'a Article,
    pub metadata: ContextMetadata,
}

impl<'a> ExecutionContext<'a> {
    /// Build the context for an article as of `now`
    pub fn build(article: &'a Article, now: DateTime<Utc>) -> Self {
        let metadata = ContextMetadata {
            word_count: article.content.split_whitespace().count(),
            content_length: article.content.chars().count(),
            age_days: (now - article.last_modified).num_days().max(0),
        };
        Self { article, metadata }
    }

    /// Age in 30-day months
    pub fn age_months(&self) -> f64 {
        self.metadata.age_days as f64 / 30.0
    }

    pub fn content(&self) -> &'a str {
        &self.article.content
    }
}

mod fs;
mod memory;

pub use fs::DirectoryArticleStore;
pub use memory::InMemoryArticleStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Knowledge-base article as supplied by the article store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    /// Plain text or markdown body
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(alias = "lastModified")]
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "excerpt")]
    pub description: Option<String>,
}

/// Selection criteria for listing articles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

impl ArticleFilter {
    /// Check whether an article satisfies the category and tag criteria
    pub fn matches(&self, article: &Article) -> bool {
        if let Some(category) = &self.category {
            if !article.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !article.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        true
    }

    /// Apply the filter to an ordered sequence of articles
    pub fn apply<'a, I>(&self, articles: I) -> Vec<Article>
    where
        I: IntoIterator<Item = &'a Article>,
    {
        let matching = articles.into_iter().filter(|a| self.matches(a)).cloned();
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}

/// Source of articles consumed by the audit engine
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch one article, `AuditError::ArticleNotFound` if it does not exist
    async fn get_article(&self, id: &str) -> Result<Article>;

    /// List articles matching the filter, in store order
    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>>;
}

use super::{Article, ArticleFilter, ArticleStore};
use crate::error::{AuditError, Result};
use async_trait::async_trait;

/// Article store backed by an in-memory list, preserving insertion order
#[derive(Debug, Default, Clone)]
pub struct InMemoryArticleStore {
    articles: Vec<Article>,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an article, replacing any existing article with the same id
    pub fn insert(&mut self, article: Article) {
        match self.articles.iter_mut().find(|a| a.id == article.id) {
            Some(existing) => *existing = article,
            None => self.articles.push(article),
        }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

impl FromIterator<Article> for InMemoryArticleStore {
    fn from_iter<T: IntoIterator<Item = Article>>(iter: T) -> Self {
        let mut store = Self::new();
        for article in iter {
            store.insert(article);
        }
        store
    }
}

#[async_trait]
impl ArticleStore for InMemoryArticleStore {
    async fn get_article(&self, id: &str) -> Result<Article> {
        self.articles
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AuditError::ArticleNotFound { id: id.to_string() })
    }

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        Ok(filter.apply(&self.articles))
    }
}

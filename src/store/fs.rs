use super::{Article, ArticleFilter, ArticleStore, InMemoryArticleStore};
use crate::error::{AuditError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// A JSON file holds either a single article or an array of articles
#[derive(Deserialize)]
#[serde(untagged)]
enum ArticleFile {
    Many(Vec<Article>),
    One(Box<Article>),
}

/// Article store loaded from `*.json` files in a directory
#[derive(Debug, Clone)]
pub struct DirectoryArticleStore {
    root: PathBuf,
    inner: InMemoryArticleStore,
}

impl DirectoryArticleStore {
    /// Load every `*.json` file under `root`, in file-name order
    pub async fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut paths = Vec::new();

        let mut entries = fs::read_dir(&root)
            .await
            .map_err(|e| AuditError::Store(format!("cannot read {}: {}", root.display(), e)))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AuditError::Store(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut inner = InMemoryArticleStore::new();
        for path in &paths {
            for article in Self::read_file(path).await? {
                inner.insert(article);
            }
        }

        debug!(path = %root.display(), files = paths.len(), articles = inner.len(), "Loaded articles");
        Ok(Self { root, inner })
    }

    async fn read_file(path: &Path) -> Result<Vec<Article>> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| AuditError::Store(format!("cannot read {}: {}", path.display(), e)))?;
        let parsed: ArticleFile = serde_json::from_str(&raw)
            .map_err(|e| AuditError::Store(format!("invalid article file {}: {}", path.display(), e)))?;

        Ok(match parsed {
            ArticleFile::Many(articles) => articles,
            ArticleFile::One(article) => vec![*article],
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ArticleStore for DirectoryArticleStore {
    async fn get_article(&self, id: &str) -> Result<Article> {
        self.inner.get_article(id).await
    }

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        self.inner.list_articles(filter).await
    }
}

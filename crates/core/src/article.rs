//! Articles and where they come from.
//!
//! This module defines the immutable [`Article`] value and the
//! [`ArticleRepository`] seam sessions load articles through, along with
//! [`CatalogRepository`], a JSON-backed catalog.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{ReadcastError, Result};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[\w'-]+\b").expect("valid word pattern"));

const SAMPLE_CATALOG: &str = include_str!("../data/sample_articles.json");

/// A news article or podcast page.
///
/// Created once per fetch and never mutated. The serialized form uses the
/// catalog's camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Stable identifier, also used to key downloads and playback
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    /// Short teaser shown in listings
    #[serde(rename = "contentSnippet")]
    pub snippet: String,
    pub full_content: String,
    /// Page the article was published at
    #[serde(rename = "articleUrl")]
    pub source_url: String,
    /// Publisher name
    pub source: String,
    pub published_date: String,
}

impl Article {
    /// Word count of the full content.
    pub fn word_count(&self) -> usize {
        count_words(&self.full_content)
    }

    /// Estimated reading time in minutes (assuming 200 words per minute).
    pub fn reading_time(&self) -> f64 {
        self.word_count() as f64 / 200.0
    }
}

/// Count words in text using a simple regex pattern
fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Source of articles for listing and for sessions.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn list_articles(&self) -> Result<Vec<Article>>;

    /// # Errors
    ///
    /// [`ReadcastError::ArticleNotFound`] for an unknown id,
    /// [`ReadcastError::ArticleFetch`] when the source cannot be read.
    async fn get_article(&self, id: &str) -> Result<Article>;
}

#[derive(Debug, Clone)]
enum CatalogSource {
    Json(String),
    File(PathBuf),
}

/// Articles from a JSON array, parsed once and cached.
#[derive(Debug)]
pub struct CatalogRepository {
    source: CatalogSource,
    latency: Duration,
    cache: RwLock<Option<Arc<Vec<Article>>>>,
}

impl CatalogRepository {
    /// Catalog backed by a JSON string.
    pub fn from_json(json: impl Into<String>) -> Self {
        Self::with_source(CatalogSource::Json(json.into()))
    }

    /// Catalog backed by a JSON file, read on first use.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::with_source(CatalogSource::File(path.into()))
    }

    /// The bundled sample catalog of Vietnamese podcast articles.
    pub fn sample() -> Self {
        Self::from_json(SAMPLE_CATALOG)
    }

    /// Adds an artificial delay to every lookup, simulating a slow network.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn with_source(source: CatalogSource) -> Self {
        Self { source, latency: Duration::ZERO, cache: RwLock::new(None) }
    }

    async fn articles(&self) -> Result<Arc<Vec<Article>>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            return Ok(Arc::clone(cached));
        }

        let json = match &self.source {
            CatalogSource::Json(json) => json.clone(),
            CatalogSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                ReadcastError::ArticleFetch { message: format!("{}: {}", path.display(), e) }
            })?,
        };

        let articles: Vec<Article> =
            serde_json::from_str(&json).map_err(|e| ReadcastError::ArticleFetch { message: e.to_string() })?;
        tracing::debug!(count = articles.len(), "article catalog loaded");

        let articles = Arc::new(articles);
        *cache = Some(Arc::clone(&articles));
        Ok(articles)
    }
}

#[async_trait]
impl ArticleRepository for CatalogRepository {
    async fn list_articles(&self) -> Result<Vec<Article>> {
        Ok(self.articles().await?.as_ref().clone())
    }

    async fn get_article(&self, id: &str) -> Result<Article> {
        self.articles()
            .await?
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ReadcastError::ArticleNotFound { id: id.to_string() })
    }
}

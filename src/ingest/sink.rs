// src/ingest/sink.rs
//! Downstream collaborators: article persistence and entity extraction.
//!
//! Storage schema, URL de-duplication and NER live outside this crate; the
//! pipeline only needs these traits.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::ingest::types::{ArticleCandidate, SourceCategory};

/// Opaque id returned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArticleId(pub u64);

/// Record handed to persistence for every accepted article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    pub source: String,
    pub headline: String,
    pub description: String,
    pub published_at: Option<String>,
    pub article_url: String,
    pub image_url: String,
    pub category: SourceCategory,
}

impl NewArticle {
    pub fn from_candidate(c: ArticleCandidate, category: SourceCategory) -> Self {
        Self {
            source: c.source,
            headline: c.headline,
            description: c.description,
            published_at: c.published_at,
            article_url: c.article_url,
            image_url: c.image_url,
            category,
        }
    }

    /// Text given to entity extraction.
    pub fn analysis_text(&self) -> String {
        format!("{} {}", self.headline, self.description)
    }
}

/// Categorized entities for one article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReport {
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub political_parties_and_militias: Vec<String>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert_article(&self, article: &NewArticle) -> Result<ArticleId>;
    async fn insert_entities(&self, article: ArticleId, entities: &EntityReport) -> Result<()>;
}

#[async_trait::async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<EntityReport>;
}

/// Extractor that finds nothing. Used when no NER backend is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEntityExtractor;

#[async_trait::async_trait]
impl EntityExtractor for NullEntityExtractor {
    async fn analyze(&self, _text: &str) -> Result<EntityReport> {
        Ok(EntityReport::default())
    }
}

/// Writes one JSON object per accepted article (and per entity report).
pub struct JsonLinesStore<W: Write + Send> {
    out: Mutex<W>,
    next_id: AtomicU64,
}

impl<W: Write + Send> JsonLinesStore<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }

    fn write_line(&self, value: &serde_json::Value) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("json-lines writer poisoned"))?;
        serde_json::to_writer(&mut *out, value)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<W: Write + Send> ArticleStore for JsonLinesStore<W> {
    async fn insert_article(&self, article: &NewArticle) -> Result<ArticleId> {
        let id = ArticleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write_line(&serde_json::json!({ "id": id, "article": article }))?;
        Ok(id)
    }

    async fn insert_entities(&self, article: ArticleId, entities: &EntityReport) -> Result<()> {
        if *entities == EntityReport::default() {
            return Ok(());
        }
        self.write_line(&serde_json::json!({ "id": article, "entities": entities }))
    }
}

/// In-memory store with URL de-duplication; handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Mutex<Vec<(ArticleId, NewArticle)>>,
    entities: Mutex<Vec<(ArticleId, EntityReport)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn articles(&self) -> Vec<NewArticle> {
        self.articles
            .lock()
            .map(|v| v.iter().map(|(_, a)| a.clone()).collect())
            .unwrap_or_default()
    }

    pub fn entities(&self) -> Vec<(ArticleId, EntityReport)> {
        self.entities.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_article(&self, article: &NewArticle) -> Result<ArticleId> {
        let mut v = self
            .articles
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        // Same URL → same row, like a unique index on article_url would do.
        if article.article_url != crate::ingest::types::NOT_AVAILABLE {
            if let Some((id, _)) = v.iter().find(|(_, a)| a.article_url == article.article_url) {
                return Ok(*id);
            }
        }
        let id = ArticleId(v.len() as u64 + 1);
        v.push((id, article.clone()));
        Ok(id)
    }

    async fn insert_entities(&self, article: ArticleId, entities: &EntityReport) -> Result<()> {
        self.entities
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?
            .push((article, entities.clone()));
        Ok(())
    }
}

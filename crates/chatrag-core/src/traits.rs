use async_trait::async_trait;

use crate::error::Result;
use crate::filter::SearchFilter;
use crate::key::CanonicalKey;
use crate::types::{DenseEntry, SearchHit, StoredEntry};

/// Text to fixed-length vector.
///
/// Implementations must return vectors of exactly `dim()` components.
pub trait EmbeddingProvider: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Role-tagged chat message sent to a completion provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Generative model behind a plain request/response call.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Similarity index over `(key, vector, payload)` triples.
#[async_trait]
pub trait DenseIndex: Send + Sync {
    /// Replaces any existing entry at each key and returns the entries now
    /// held by the index.
    async fn upsert(&self, entries: &[DenseEntry]) -> Result<Vec<StoredEntry>>;

    /// Up to `limit` nearest entries under cosine similarity that satisfy
    /// `filter`, best first.
    async fn query(
        &self,
        vector: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;
}

/// Durable record store backing the lexical ranker.
#[async_trait]
pub trait SparseStore: Send + Sync {
    /// Idempotent by key; returns the authoritative entries after the write.
    async fn upsert(&self, entries: &[StoredEntry]) -> Result<Vec<StoredEntry>>;

    /// Unranked listing of up to `limit` entries matching `filter`.
    async fn scan(&self, filter: &SearchFilter, limit: usize) -> Result<Vec<StoredEntry>>;

    /// Entries for the given keys; unknown keys are skipped.
    async fn retrieve(&self, keys: &[CanonicalKey]) -> Result<Vec<StoredEntry>>;
}

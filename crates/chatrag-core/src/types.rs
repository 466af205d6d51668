//! Domain types shared by the dense index, the sparse store and the ranker.

use serde::{Deserialize, Serialize};

use crate::key::CanonicalKey;

/// Stable external identifier of a record (a chat message number).
pub type DomainId = i64;

/// A chat message as handed over by the ingest collaborator.
///
/// Immutable once indexed. Re-ingesting the same `domain_id` overwrites the
/// previous entry in both indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub domain_id: DomainId,
    pub text: String,
    pub author_id: i64,
    pub chat_id: i64,
    /// Unix seconds.
    pub timestamp: f64,
}

/// Metadata stored alongside every entry in both indexes.
///
/// The text is kept untokenized so the lexical corpus can be rebuilt from
/// the store at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub domain_id: DomainId,
    pub text: String,
    pub author_id: i64,
    pub chat_id: i64,
    pub timestamp: f64,
}

impl From<&Record> for Payload {
    fn from(r: &Record) -> Self {
        Self {
            domain_id: r.domain_id,
            text: r.text.clone(),
            author_id: r.author_id,
            chat_id: r.chat_id,
            timestamp: r.timestamp,
        }
    }
}

/// Dense index row: one per key.
#[derive(Debug, Clone)]
pub struct DenseEntry {
    pub key: CanonicalKey,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// The authoritative `(key, payload)` pair held by a store after a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: CanonicalKey,
    pub payload: Payload,
}

/// Indicates which producer emitted a ranked hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Lexical,
    Fused,
}

/// One entry of a ranked candidate list.
///
/// `score` is producer-specific (cosine similarity, BM25 relevance or RRF
/// score) but higher is always better. Only the rank position crosses into
/// fusion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DomainId,
    pub score: f32,
    pub source: SourceKind,
}

impl SearchHit {
    pub fn new(id: DomainId, score: f32, source: SourceKind) -> Self {
        Self { id, score, source }
    }
}

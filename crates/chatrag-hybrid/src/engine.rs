//! Query orchestration over the dense index, the sparse store and the
//! in-memory lexical ranker.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use chatrag_core::config::RetrievalSettings;
use chatrag_core::error::{Error, Result};
use chatrag_core::filter::SearchFilter;
use chatrag_core::key::canonical_key;
use chatrag_core::traits::{DenseIndex, EmbeddingProvider, SparseStore};
use chatrag_core::types::{DenseEntry, DomainId, Payload, Record, SearchHit, StoredEntry};
use chatrag_text::{Bm25Params, LexicalRanker, Normalizer};

use crate::fusion::{fuse, RRF_K};
use crate::maintainer::IndexMaintainer;

/// Per-query knobs: `k` fused results from the top `m` of each ranker.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub k: usize,
    pub m: usize,
    pub filter: SearchFilter,
}

impl SearchOptions {
    pub fn new(k: usize, m: usize) -> Self {
        Self { k, m, filter: SearchFilter::default() }
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new(10, 50)
    }
}

impl From<&RetrievalSettings> for SearchOptions {
    fn from(s: &RetrievalSettings) -> Self {
        Self::new(s.k, s.m)
    }
}

pub struct HybridSearchEngine<D, S>
where
    D: DenseIndex,
    S: SparseStore,
{
    dense: D,
    sparse: Arc<S>,
    embedder: Arc<dyn EmbeddingProvider>,
    normalizer: Normalizer,
    lexical: Arc<LexicalRanker>,
    k_rrf: usize,
    scan_limit: usize,
}

impl<D, S> HybridSearchEngine<D, S>
where
    D: DenseIndex,
    S: SparseStore + 'static,
{
    /// Starts with an empty lexical corpus; call [`reload_lexical`](Self::reload_lexical)
    /// to pick up what the sparse store already holds.
    pub fn new(
        dense: D,
        sparse: S,
        embedder: Arc<dyn EmbeddingProvider>,
        normalizer: Normalizer,
        params: Bm25Params,
    ) -> Self {
        Self {
            dense,
            sparse: Arc::new(sparse),
            embedder,
            normalizer,
            lexical: Arc::new(LexicalRanker::new(params)),
            k_rrf: RRF_K,
            scan_limit: 10_000,
        }
    }

    pub fn with_k_rrf(mut self, k_rrf: usize) -> Self {
        self.k_rrf = k_rrf;
        self
    }

    /// Upper bound on rows pulled from the sparse store per scan.
    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.scan_limit = scan_limit;
        self
    }

    pub fn lexical(&self) -> &Arc<LexicalRanker> {
        &self.lexical
    }

    pub fn sparse(&self) -> &Arc<S> {
        &self.sparse
    }

    pub fn dense(&self) -> &D {
        &self.dense
    }

    /// A maintainer sharing this engine's store and ranker.
    pub fn maintainer(&self, interval: std::time::Duration) -> IndexMaintainer<S> {
        IndexMaintainer::new(
            Arc::clone(&self.sparse),
            Arc::clone(&self.lexical),
            self.normalizer.clone(),
            self.scan_limit,
            interval,
        )
    }

    pub async fn ingest(&self, record: &Record) -> Result<StoredEntry> {
        let mut stored = self.ingest_batch(std::slice::from_ref(record)).await?;
        stored
            .pop()
            .ok_or_else(|| Error::Operation(format!("record {} was not stored", record.domain_id)))
    }

    /// Embeds, upserts into both indexes concurrently, then extends the
    /// lexical corpus once for the whole batch.
    ///
    /// Returns the sparse store's authoritative entries. A repeated
    /// `domain_id` overwrites; within one batch the last record wins.
    #[instrument(skip_all, fields(count = records.len()))]
    pub async fn ingest_batch(&self, records: &[Record]) -> Result<Vec<StoredEntry>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embed_texts(texts).await?;

        let mut dense_entries = Vec::with_capacity(records.len());
        let mut sparse_entries = Vec::with_capacity(records.len());
        for (record, vector) in records.iter().zip(vectors) {
            let key = canonical_key(record.domain_id);
            let payload = Payload::from(record);
            sparse_entries.push(StoredEntry { key, payload: payload.clone() });
            dense_entries.push(DenseEntry { key, vector, payload });
        }

        let (_, stored) = tokio::try_join!(
            self.dense.upsert(&dense_entries),
            self.sparse.upsert(&sparse_entries)
        )?;

        let docs: Vec<(DomainId, Vec<String>)> = stored
            .iter()
            .map(|e| (e.payload.domain_id, self.normalizer.normalize(&e.payload.text)))
            .collect();
        self.lexical.extend_many(docs);
        debug!(count = stored.len(), corpus = self.lexical.len(), "ingested");
        Ok(stored)
    }

    /// Top-`k` domain ids by reciprocal rank fusion of the dense and
    /// lexical lists, each cut at `m`.
    ///
    /// Embedding and dense failures propagate. A failed sparse scan only
    /// empties the lexical list.
    #[instrument(skip_all, fields(k = options.k, m = options.m))]
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let vector = self.embed_query(query).await?;
        let terms = self.normalizer.normalize(query);
        let (dense, lexical) = tokio::join!(
            self.dense.query(&vector, &options.filter, options.m),
            self.lexical_candidates(&terms, &options.filter, options.m)
        );
        let dense = dense?;
        debug!(dense = dense.len(), lexical = lexical.len(), "candidates");
        Ok(fuse(&dense, &lexical, options.k, self.k_rrf))
    }

    /// Lexical top-`m` over the documents the filter admits, with corpus
    /// statistics computed on that subset.
    async fn lexical_candidates(
        &self,
        terms: &[String],
        filter: &SearchFilter,
        m: usize,
    ) -> Vec<SearchHit> {
        let snapshot = self.lexical.snapshot();
        if terms.is_empty() || snapshot.is_empty() {
            return Vec::new();
        }
        let admitted = match self.sparse.scan(filter, self.scan_limit).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "sparse scan failed; continuing with dense results only");
                return Vec::new();
            }
        };
        let subset = snapshot.subset(admitted.iter().map(|e| e.payload.domain_id));
        subset.rank(terms, m)
    }

    /// One maintainer tick on demand. Returns the new corpus size.
    pub async fn reload_lexical(&self) -> Result<usize> {
        self.maintainer(std::time::Duration::ZERO).run_once().await
    }

    /// `(domain_id, text)` for each known id, in the order requested.
    pub async fn get_texts(&self, ids: &[DomainId]) -> Result<Vec<(DomainId, String)>> {
        let keys: Vec<_> = ids.iter().copied().map(canonical_key).collect();
        let entries = self.sparse.retrieve(&keys).await?;
        Ok(entries.into_iter().map(|e| (e.payload.domain_id, e.payload.text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(vec![text.to_string()]).await?;
        vectors.pop().ok_or_else(|| Error::Embedding("no vector returned for query".to_string()))
    }

    async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        let expected = texts.len();
        let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {e}")))??;
        if vectors.len() != expected {
            let got = vectors.len();
            return Err(Error::Embedding(format!("expected {expected} vectors, got {got}")));
        }
        let dim = self.embedder.dim();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, got: bad.len() });
        }
        Ok(vectors)
    }
}

//! In-process implementations of [`DenseIndex`] and [`SparseStore`].
//!
//! Used for tests and single-process development. Both are keyed by
//! [`CanonicalKey`], so repeated upserts of the same record overwrite.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::filter::SearchFilter;
use crate::key::CanonicalKey;
use crate::traits::{DenseIndex, SparseStore};
use crate::types::{DenseEntry, Payload, SearchHit, SourceKind, StoredEntry};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| Error::Backend("in-memory store lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| Error::Backend("in-memory store lock poisoned".into()))
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

pub struct MemoryDenseIndex {
    dim: usize,
    entries: RwLock<BTreeMap<CanonicalKey, DenseEntry>>,
}

impl MemoryDenseIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: RwLock::new(BTreeMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<DenseEntry> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn check_dim(&self, got: usize) -> Result<()> {
        if got != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, got });
        }
        Ok(())
    }
}

#[async_trait]
impl DenseIndex for MemoryDenseIndex {
    async fn upsert(&self, entries: &[DenseEntry]) -> Result<Vec<StoredEntry>> {
        for e in entries {
            self.check_dim(e.vector.len())?;
        }
        let mut map = write(&self.entries)?;
        let mut stored = Vec::with_capacity(entries.len());
        for e in entries {
            map.insert(e.key, e.clone());
            stored.push(StoredEntry { key: e.key, payload: e.payload.clone() });
        }
        Ok(stored)
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        self.check_dim(vector.len())?;
        filter.validate()?;
        let map = read(&self.entries)?;
        let mut hits: Vec<SearchHit> = map
            .values()
            .filter(|e| filter.matches(&e.payload))
            .map(|e| {
                let score = cosine_similarity(vector, &e.vector);
                SearchHit::new(e.payload.domain_id, score, SourceKind::Dense)
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[derive(Default)]
pub struct MemorySparseStore {
    entries: RwLock<BTreeMap<CanonicalKey, Payload>>,
}

impl MemorySparseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SparseStore for MemorySparseStore {
    async fn upsert(&self, entries: &[StoredEntry]) -> Result<Vec<StoredEntry>> {
        let mut map = write(&self.entries)?;
        for e in entries {
            map.insert(e.key, e.payload.clone());
        }
        Ok(entries
            .iter()
            .filter_map(|e| map.get(&e.key).map(|p| StoredEntry { key: e.key, payload: p.clone() }))
            .collect())
    }

    async fn scan(&self, filter: &SearchFilter, limit: usize) -> Result<Vec<StoredEntry>> {
        filter.validate()?;
        let map = read(&self.entries)?;
        Ok(map
            .iter()
            .filter(|(_, p)| filter.matches(p))
            .take(limit)
            .map(|(k, p)| StoredEntry { key: *k, payload: p.clone() })
            .collect())
    }

    async fn retrieve(&self, keys: &[CanonicalKey]) -> Result<Vec<StoredEntry>> {
        let map = read(&self.entries)?;
        Ok(keys
            .iter()
            .filter_map(|k| map.get(k).map(|p| StoredEntry { key: *k, payload: p.clone() }))
            .collect())
    }
}

//! Dense index on a LanceDB table with a fixed-width `vector` column.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, RecordBatch};
use async_trait::async_trait;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};

use chatrag_core::error::{Error, Result};
use chatrag_core::filter::SearchFilter;
use chatrag_core::key::CanonicalKey;
use chatrag_core::traits::DenseIndex;
use chatrag_core::types::{DenseEntry, SearchHit, SourceKind, StoredEntry};

use crate::filter::to_predicate;
use crate::schema::build_dense_schema;
use crate::table::{
    collect_batches, ensure_table, entries_from_batch, merge_by_key, open_table, payload_columns,
    similarities,
};

pub struct LanceDenseIndex {
    table: Table,
    dim: usize,
}

impl LanceDenseIndex {
    /// Opens `name`, creating it empty when missing.
    pub async fn open(conn: &Connection, name: &str, dim: usize) -> Result<Self> {
        let width = i32::try_from(dim)
            .map_err(|_| Error::InvalidConfig(format!("dimension {dim} too large")))?;
        ensure_table(conn, name, build_dense_schema(width)).await?;
        let table = open_table(conn, name).await?;
        Ok(Self { table, dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(Error::backend)
    }

    fn to_batch(&self, entries: &[DenseEntry]) -> Result<RecordBatch> {
        let stored: Vec<StoredEntry> = entries
            .iter()
            .map(|e| StoredEntry { key: e.key, payload: e.payload.clone() })
            .collect();
        let mut columns = payload_columns(&stored);
        let width = i32::try_from(self.dim).map_err(Error::backend)?;
        let vectors =
            entries.iter().map(|e| Some(e.vector.iter().copied().map(Some).collect::<Vec<_>>()));
        let vector_column =
            FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, width);
        columns.push(Arc::new(vector_column));
        RecordBatch::try_new(build_dense_schema(width), columns).map_err(Error::backend)
    }
}

#[async_trait]
impl DenseIndex for LanceDenseIndex {
    async fn upsert(&self, entries: &[DenseEntry]) -> Result<Vec<StoredEntry>> {
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != self.dim) {
            return Err(Error::DimensionMismatch { expected: self.dim, got: bad.vector.len() });
        }
        // last write wins inside one batch; merge_insert rejects duplicate source keys
        let mut unique: BTreeMap<CanonicalKey, &DenseEntry> = BTreeMap::new();
        for e in entries {
            unique.insert(e.key, e);
        }
        let deduped: Vec<DenseEntry> = unique.into_values().cloned().collect();
        if deduped.is_empty() {
            return Ok(Vec::new());
        }
        merge_by_key(&self.table, self.to_batch(&deduped)?).await?;
        tracing::debug!(count = deduped.len(), "dense upsert");
        Ok(deduped.into_iter().map(|e| StoredEntry { key: e.key, payload: e.payload }).collect())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, got: vector.len() });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut query = self
            .table
            .vector_search(vector.to_vec())
            .map_err(Error::backend)?
            .distance_type(DistanceType::Cosine)
            .limit(limit);
        if let Some(predicate) = to_predicate(filter)? {
            query = query.only_if(predicate);
        }
        let batches = collect_batches(query.execute().await.map_err(Error::backend)?).await?;

        let mut hits = Vec::new();
        for batch in &batches {
            let entries = entries_from_batch(batch)?;
            let scores = similarities(batch)?;
            hits.extend(
                entries
                    .iter()
                    .zip(scores)
                    .map(|(e, s)| SearchHit::new(e.payload.domain_id, s, SourceKind::Dense)),
            );
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }
}

//! Sparse store: payload rows without vectors, the durable source for
//! lexical corpus rebuilds.

use std::collections::{BTreeMap, HashMap};

use arrow_array::RecordBatch;
use async_trait::async_trait;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};

use chatrag_core::error::{Error, Result};
use chatrag_core::filter::SearchFilter;
use chatrag_core::key::CanonicalKey;
use chatrag_core::traits::SparseStore;
use chatrag_core::types::StoredEntry;

use crate::filter::{quote, to_predicate};
use crate::schema::build_sparse_schema;
use crate::table::{
    collect_batches, ensure_table, entries_from_batch, merge_by_key, open_table, payload_columns,
};

pub struct LanceSparseStore {
    table: Table,
}

impl LanceSparseStore {
    pub async fn open(conn: &Connection, name: &str) -> Result<Self> {
        ensure_table(conn, name, build_sparse_schema()).await?;
        Ok(Self { table: open_table(conn, name).await? })
    }

    pub async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(Error::backend)
    }

    async fn fetch(&self, predicate: Option<String>, limit: usize) -> Result<Vec<StoredEntry>> {
        let mut query = self.table.query().limit(limit);
        if let Some(p) = predicate {
            query = query.only_if(p);
        }
        let batches = collect_batches(query.execute().await.map_err(Error::backend)?).await?;
        let mut out = Vec::new();
        for batch in &batches {
            out.extend(entries_from_batch(batch)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl SparseStore for LanceSparseStore {
    async fn upsert(&self, entries: &[StoredEntry]) -> Result<Vec<StoredEntry>> {
        let mut unique: BTreeMap<CanonicalKey, &StoredEntry> = BTreeMap::new();
        for e in entries {
            unique.insert(e.key, e);
        }
        let deduped: Vec<StoredEntry> = unique.into_values().cloned().collect();
        if deduped.is_empty() {
            return Ok(Vec::new());
        }
        let batch = RecordBatch::try_new(build_sparse_schema(), payload_columns(&deduped))
            .map_err(Error::backend)?;
        merge_by_key(&self.table, batch).await?;
        tracing::debug!(count = deduped.len(), "sparse upsert");
        Ok(deduped)
    }

    async fn scan(&self, filter: &SearchFilter, limit: usize) -> Result<Vec<StoredEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.fetch(to_predicate(filter)?, limit).await
    }

    async fn retrieve(&self, keys: &[CanonicalKey]) -> Result<Vec<StoredEntry>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let list = keys.iter().map(|k| quote(&k.to_string())).collect::<Vec<_>>().join(", ");
        let found = self.fetch(Some(format!("key IN ({list})")), keys.len()).await?;
        let mut by_key: HashMap<CanonicalKey, StoredEntry> =
            found.into_iter().map(|e| (e.key, e)).collect();
        // requested order, unknown keys skipped
        Ok(keys.iter().filter_map(|k| by_key.remove(k)).collect())
    }
}

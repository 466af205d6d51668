//! LanceDB connection helpers and Arrow row conversion.

use std::sync::Arc;

use arrow_array::{Array, Float64Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::Schema;
use futures::{Stream, TryStreamExt};
use lancedb::{connect, Connection, Table};

use chatrag_core::error::{Error, Result};
use chatrag_core::key::CanonicalKey;
use chatrag_core::types::{Payload, StoredEntry};

pub async fn open_db(uri: &str) -> Result<Connection> {
    connect(uri).execute().await.map_err(Error::backend)
}

/// Creates `name` with zero rows if it does not exist yet.
pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<Schema>) -> Result<()> {
    let names = conn.table_names().execute().await.map_err(Error::backend)?;
    if names.iter().any(|n| n == name) {
        return Ok(());
    }
    tracing::info!(table = name, "creating empty table");
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    conn.create_table(name, Box::new(iter)).execute().await.map_err(Error::backend)?;
    Ok(())
}

pub async fn open_table(conn: &Connection, name: &str) -> Result<Table> {
    conn.open_table(name).execute().await.map_err(Error::backend)
}

/// Upserts `batch` keyed on the `key` column.
pub async fn merge_by_key(table: &Table, batch: RecordBatch) -> Result<()> {
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    let mut mi = table.merge_insert(&["key"]);
    mi.when_matched_update_all(None).when_not_matched_insert_all();
    mi.execute(reader).await.map_err(Error::backend)?;
    Ok(())
}

pub async fn collect_batches<S, E>(mut stream: S) -> Result<Vec<RecordBatch>>
where
    S: Stream<Item = std::result::Result<RecordBatch, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut out = Vec::new();
    while let Some(batch) = stream.try_next().await.map_err(Error::backend)? {
        if batch.num_rows() > 0 {
            out.push(batch);
        }
    }
    Ok(out)
}

/// Column arrays for the payload fields shared by both schemas.
pub fn payload_columns(entries: &[StoredEntry]) -> Vec<Arc<dyn Array>> {
    vec![
        Arc::new(StringArray::from_iter_values(entries.iter().map(|e| e.key.to_string()))),
        Arc::new(Int64Array::from_iter_values(entries.iter().map(|e| e.payload.domain_id))),
        Arc::new(StringArray::from_iter_values(entries.iter().map(|e| e.payload.text.as_str()))),
        Arc::new(Int64Array::from_iter_values(entries.iter().map(|e| e.payload.author_id))),
        Arc::new(Int64Array::from_iter_values(entries.iter().map(|e| e.payload.chat_id))),
        Arc::new(Float64Array::from_iter_values(entries.iter().map(|e| e.payload.timestamp))),
    ]
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::Backend(format!("column {name} missing or mistyped")))
}

/// Decodes every row of `batch` back into a stored entry.
pub fn entries_from_batch(batch: &RecordBatch) -> Result<Vec<StoredEntry>> {
    let keys = column::<StringArray>(batch, "key")?;
    let domain_ids = column::<Int64Array>(batch, "domain_id")?;
    let texts = column::<StringArray>(batch, "text")?;
    let authors = column::<Int64Array>(batch, "author_id")?;
    let chats = column::<Int64Array>(batch, "chat_id")?;
    let timestamps = column::<Float64Array>(batch, "timestamp")?;
    (0..batch.num_rows())
        .map(|i| {
            let key: CanonicalKey = keys.value(i).parse().map_err(Error::backend)?;
            Ok(StoredEntry {
                key,
                payload: Payload {
                    domain_id: domain_ids.value(i),
                    text: texts.value(i).to_string(),
                    author_id: authors.value(i),
                    chat_id: chats.value(i),
                    timestamp: timestamps.value(i),
                },
            })
        })
        .collect()
}

/// Similarity scores for a vector search result, derived from `_distance`.
pub fn similarities(batch: &RecordBatch) -> Result<Vec<f32>> {
    let distances = column::<arrow_array::Float32Array>(batch, "_distance")?;
    Ok((0..batch.num_rows()).map(|i| 1.0 - distances.value(i)).collect())
}

use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

fn payload_fields() -> Vec<Field> {
    vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("domain_id", DataType::Int64, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("author_id", DataType::Int64, false),
        Field::new("chat_id", DataType::Int64, false),
        Field::new("timestamp", DataType::Float64, false),
    ]
}

/// Sparse store rows: the payload only, no vector column.
pub fn build_sparse_schema() -> Arc<Schema> {
    Arc::new(Schema::new(payload_fields()))
}

/// Dense index rows: payload plus a fixed-width embedding.
pub fn build_dense_schema(dim: i32) -> Arc<Schema> {
    let mut fields = payload_fields();
    let item = Arc::new(Field::new("item", DataType::Float32, true));
    fields.push(Field::new("vector", DataType::FixedSizeList(item, dim), true));
    Arc::new(Schema::new(fields))
}

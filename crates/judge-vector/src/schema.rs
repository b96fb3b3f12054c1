use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Columns of the passage table. `identifiers` and `rulings` hold JSON text.
pub fn build_passage_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("original_text", DataType::Utf8, false),
        Field::new("identifiers", DataType::Utf8, true),
        Field::new("source", DataType::Utf8, false),
        Field::new("rulings", DataType::Utf8, false),
        Field::new("passage_type", DataType::Utf8, false),
        Field::new("section", DataType::Utf8, false),
        Field::new("loaded_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

use anyhow::{ensure, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use lancedb::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use judge_core::traits::{Embedder, PassageSink};
use judge_core::types::Passage;

use crate::schema::build_passage_schema;
use crate::table::{open_db, table_exists};

/// Row id: blake3 over source, content and the row's position in the table.
pub fn passage_id(source: &str, content: &str, position: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_bytes());
    hasher.update(&[0]);
    hasher.update(content.as_bytes());
    hasher.update(&(position as u64).to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Embeds each batch and appends it to a LanceDB table, creating the table
/// on the first write.
pub struct LancePassageSink {
    rt: Runtime,
    db: Connection,
    table_name: String,
    embedder: Box<dyn Embedder>,
    /// Rows already in the table when the sink was opened.
    existing: usize,
    written: usize,
}

impl LancePassageSink {
    pub fn open(db_path: &Path, table_name: &str, embedder: Box<dyn Embedder>) -> Result<Self> {
        let rt = Runtime::new()?;
        let db = rt.block_on(open_db(&db_path.to_string_lossy()))?;
        info!(db = %db_path.display(), table = table_name, "Opened passage store");
        let mut sink = Self { rt, db, table_name: table_name.to_string(), embedder, existing: 0, written: 0 };
        sink.existing = sink.count_rows()?;
        Ok(sink)
    }

    /// Rows written through this sink so far.
    pub fn rows_written(&self) -> usize {
        self.written
    }

    pub fn count_rows(&self) -> Result<usize> {
        self.rt.block_on(async {
            if !table_exists(&self.db, &self.table_name).await? {
                return Ok(0);
            }
            let table = self.db.open_table(&self.table_name).execute().await?;
            Ok(table.count_rows(None).await?)
        })
    }

    fn to_record_batch(&self, passages: &[Passage], vectors: Vec<Vec<f32>>) -> Result<RecordBatch> {
        let dim = self.embedder.dim();
        ensure!(
            vectors.len() == passages.len(),
            "embedder returned {} vectors for {} passages",
            vectors.len(),
            passages.len()
        );
        ensure!(vectors.iter().all(|v| v.len() == dim), "embedder returned a vector that is not {dim} wide");

        let loaded_at = Utc::now().timestamp_millis();
        let mut ids = Vec::with_capacity(passages.len());
        let mut contents = Vec::with_capacity(passages.len());
        let mut names = Vec::with_capacity(passages.len());
        let mut original_texts = Vec::with_capacity(passages.len());
        let mut identifiers = Vec::with_capacity(passages.len());
        let mut sources = Vec::with_capacity(passages.len());
        let mut rulings = Vec::with_capacity(passages.len());
        let mut types = Vec::with_capacity(passages.len());
        let mut sections = Vec::with_capacity(passages.len());
        for (offset, p) in passages.iter().enumerate() {
            let m = &p.metadata;
            ids.push(passage_id(&m.source, &p.content, self.existing + self.written + offset));
            contents.push(p.content.clone());
            names.push(m.name.clone());
            original_texts.push(m.original_text.clone());
            identifiers.push(m.identifiers.as_ref().map(serde_json::to_string).transpose()?);
            sources.push(m.source.clone());
            rulings.push(serde_json::to_string(&m.rulings)?);
            types.push(m.passage_type.as_str());
            sections.push(m.section.clone());
        }
        let vectors = vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>()));

        let record_batch = RecordBatch::try_new(
            build_passage_schema(dim as i32),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(original_texts)),
                Arc::new(StringArray::from(identifiers)),
                Arc::new(StringArray::from(sources)),
                Arc::new(StringArray::from(rulings)),
                Arc::new(StringArray::from(types)),
                Arc::new(StringArray::from(sections)),
                Arc::new(TimestampMillisecondArray::from(vec![loaded_at; passages.len()])),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                    vectors,
                    dim as i32,
                )),
            ],
        )?;
        Ok(record_batch)
    }
}

impl PassageSink for LancePassageSink {
    fn add_documents(&mut self, batch: Vec<Passage>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = batch.iter().map(|p| p.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        let record_batch = self.to_record_batch(&batch, vectors)?;
        let schema = record_batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));

        self.rt.block_on(async {
            if table_exists(&self.db, &self.table_name).await? {
                self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
            } else {
                self.db.create_table(&self.table_name, reader).execute().await?;
            }
            anyhow::Ok(())
        })?;
        self.written += batch.len();
        debug!(rows = batch.len(), total = self.written, table = %self.table_name, "Appended batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passage_id_depends_on_position() {
        let a = passage_id("rules.txt", "Glossary", 3);
        assert_eq!(a, passage_id("rules.txt", "Glossary", 3));
        assert_ne!(a, passage_id("rules.txt", "Glossary", 4));
        assert_ne!(a, passage_id("other.txt", "Glossary", 3));
        assert_eq!(a.len(), 64);
    }
}

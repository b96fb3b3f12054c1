use anyhow::{anyhow, Context, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::Connection;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::debug;

use judge_core::traits::Embedder;
use judge_core::types::{Identifiers, Metadata, Passage, PassageType, Ruling};

use crate::table::{open_db, table_exists};

#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub id: String,
    pub score: f32,
    pub passage: Passage,
}

pub struct LancePassageSearch {
    rt: Runtime,
    db: Connection,
    table_name: String,
    embedder: Box<dyn Embedder>,
}

impl LancePassageSearch {
    pub fn open(db_path: &Path, table_name: &str, embedder: Box<dyn Embedder>) -> Result<Self> {
        let rt = Runtime::new()?;
        let db = rt.block_on(open_db(&db_path.to_string_lossy()))?;
        Ok(Self { rt, db, table_name: table_name.to_string(), embedder })
    }

    /// The `k` passages nearest to `question`, best first.
    pub fn search(&self, question: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        let query = self
            .embedder
            .embed_batch(&[question.to_string()])?
            .pop()
            .ok_or_else(|| anyhow!("embedder returned no vector for the question"))?;

        let batches: Vec<RecordBatch> = self.rt.block_on(async {
            if !table_exists(&self.db, &self.table_name).await? {
                return Err(anyhow!("table '{}' does not exist; load some passages first", self.table_name));
            }
            let table = self.db.open_table(&self.table_name).execute().await?;
            let stream = table.vector_search(query)?.limit(k).execute().await?;
            anyhow::Ok(stream.try_collect::<Vec<RecordBatch>>().await?)
        })?;

        let mut hits = Vec::new();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                hits.push(decode_row(batch, row)?);
            }
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        debug!(question, hits = hits.len(), "Vector search finished");
        Ok(hits)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("column '{name}' missing"))
}

fn decode_row(batch: &RecordBatch, row: usize) -> Result<ScoredPassage> {
    let text = |name: &str| -> Result<String> { Ok(string_column(batch, name)?.value(row).to_string()) };

    let identifiers_col = string_column(batch, "identifiers")?;
    let identifiers: Option<Identifiers> = if identifiers_col.is_null(row) {
        None
    } else {
        Some(serde_json::from_str(identifiers_col.value(row)).context("decoding identifiers")?)
    };
    let rulings: Vec<Ruling> =
        serde_json::from_str(string_column(batch, "rulings")?.value(row)).context("decoding rulings")?;
    let passage_type = text("passage_type")?.parse::<PassageType>().map_err(|e| anyhow!(e))?;

    let score = match batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>()) {
        Some(distance) => 1.0 - distance.value(row),
        None => 0.0,
    };

    let metadata = Metadata {
        name: text("name")?,
        original_text: text("original_text")?,
        identifiers,
        source: text("source")?,
        rulings,
        passage_type,
        section: text("section")?,
    };
    Ok(ScoredPassage { id: text("id")?, score, passage: Passage { content: text("content")?, metadata } })
}

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::PassageSink;
use crate::types::Passage;

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub passages: usize,
    pub batches: usize,
}

/// Writes a passage stream into a sink in fixed-size batches.
///
/// Batches keep arrival order and the last one may be short. The first
/// producer error or sink failure stops the load; batches already handed to
/// the sink stay there.
pub struct BatchedLoader<S: PassageSink> {
    sink: S,
    batch_size: usize,
}

impl<S: PassageSink> BatchedLoader<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn load<I>(&mut self, passages: I) -> Result<LoadStats>
    where
        I: IntoIterator<Item = Result<Passage>>,
    {
        let mut stats = LoadStats::default();
        let mut batch = Vec::with_capacity(self.batch_size);
        for passage in passages {
            batch.push(passage?);
            if batch.len() == self.batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(self.batch_size));
                self.flush(full, &mut stats)?;
            }
        }
        if !batch.is_empty() {
            self.flush(batch, &mut stats)?;
        }
        info!(passages = stats.passages, batches = stats.batches, "Load finished");
        Ok(stats)
    }

    fn flush(&mut self, batch: Vec<Passage>, stats: &mut LoadStats) -> Result<()> {
        let len = batch.len();
        self.sink.add_documents(batch).map_err(Error::Sink)?;
        stats.passages += len;
        stats.batches += 1;
        debug!("Loaded {len} documents into the database");
        Ok(())
    }
}

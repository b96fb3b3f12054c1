use crate::types::Passage;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Destination for loaded passages. Each call receives one ordered batch.
pub trait PassageSink {
    fn add_documents(&mut self, batch: Vec<Passage>) -> anyhow::Result<()>;
}

impl<S: PassageSink + ?Sized> PassageSink for &mut S {
    fn add_documents(&mut self, batch: Vec<Passage>) -> anyhow::Result<()> {
        (**self).add_documents(batch)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use judge_core::{Passage, PassageSink};

/// Wraps a sink and ticks a spinner for every stored batch.
pub struct ProgressSink<S> {
    inner: S,
    bar: ProgressBar,
}

impl<S: PassageSink> ProgressSink<S> {
    pub fn new(inner: S, label: &str) -> anyhow::Result<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} passages {msg}")?);
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Ok(Self { inner, bar })
    }

    pub fn finish(self) -> S {
        self.bar.finish_with_message("done");
        self.inner
    }
}

impl<S: PassageSink> PassageSink for ProgressSink<S> {
    fn add_documents(&mut self, batch: Vec<Passage>) -> anyhow::Result<()> {
        let len = batch.len() as u64;
        self.inner.add_documents(batch)?;
        self.bar.inc(len);
        Ok(())
    }
}

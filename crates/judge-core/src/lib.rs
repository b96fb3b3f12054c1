//! judge-core
//!
//! Turns MTGJSON card files and the comprehensive rules text into tagged
//! passages and loads them into a sink in batches.

pub mod cards;
pub mod config;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod rules;
pub mod traits;
pub mod types;

pub use cards::{split_atomic, split_detailed, AtomicPassages, DetailedPassages};
pub use error::{Error, Result};
pub use loader::{BatchedLoader, LoadStats, DEFAULT_BATCH_SIZE};
pub use rules::{split_rules, ParagraphSeparator, RulesPassages, Section};
pub use traits::{Embedder, PassageSink};
pub use types::{Identifiers, Metadata, Passage, PassageType, Ruling};

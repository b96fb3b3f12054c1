//! judge-vector
//!
//! LanceDB-backed passage storage: a [`PassageSink`](judge_core::PassageSink)
//! that embeds and appends batches, and nearest-neighbour retrieval over the
//! same table.

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use schema::build_passage_schema;
pub use search::{LancePassageSearch, ScoredPassage};
pub use writer::{passage_id, LancePassageSink};

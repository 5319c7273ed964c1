// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod fetch;
pub mod history;
pub mod indicators;
pub mod ingest;
pub mod pipeline;
pub mod recap;
pub mod sentiment;
pub mod store;
pub mod weighting;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::AggregationResult;
pub use crate::history::{HistoryEntry, HISTORY_CAP};
pub use crate::ingest::types::{Category, NewsItem};
pub use crate::pipeline::{run, RunOptions, Window};
pub use crate::store::JsonStore;

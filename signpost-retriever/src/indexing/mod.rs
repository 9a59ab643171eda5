//! The offline indexing pipeline: change detection, summarization, and
//! the orchestrating engine.

pub mod engine;
pub mod fingerprint;
pub mod summarize;

pub use engine::{IndexRunStats, Indexer, IndexerConfig};
pub use fingerprint::{FingerprintRecord, fingerprint};
pub use summarize::{DocumentProfile, SummarizeError, Summarizer, is_general_purpose};

//! signpost-retriever: resource indexing and retrieval for the signpost assistant.
//!
//! This crate owns the full pipeline that keeps a searchable semantic index
//! of an institution's resource documents in step with a remote blob
//! container, and answers queries with a ranked, deduplicated list of
//! download links.
//!
//! ## Key modules
//!
//! - **[`store`]**: the content-store boundary (list names, fetch bytes) with
//!   an Azure Blob implementation and an in-memory one for tests
//! - **[`indexing`]**: change detection (blake3 fingerprints), LLM
//!   summarization/tagging, and the orchestrating [`indexing::Indexer`]
//! - **[`chunk_index`]**: the persisted SQLite vector index of document
//!   chunks and their embeddings
//! - **[`retrieval`]**: query-time merging and ranking of candidate
//!   resources, including guaranteed inclusion of general-purpose documents
//! - **[`pathways`]**: keyword matching against the curated pathway catalog
//!
//! ## Data flow
//!
//! ```text
//! blob store → fingerprint → extract → summarize/tag → chunk ─┐
//!                                                             ▼
//!          query → embed → search ──────────────► ChunkIndex (SQLite)
//!                             │
//!                             └─► merge + dedup + general append → links
//! ```
//!
//! Indexing runs offline and commits its results in a single checkpoint;
//! retrieval is read-only and degrades to an empty result list rather than
//! failing the caller.

pub mod chunk_index;
pub mod indexing;
pub mod pathways;
pub mod retrieval;
pub mod store;

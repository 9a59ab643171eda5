//! The indexing engine: one pass over the content store.
//!
//! For every listed document the engine fetches bytes, fingerprints them,
//! and — only if the fingerprint changed — extracts text, summarizes,
//! and chunks. Per-file work runs concurrently up to a small worker
//! limit, since the LLM calls dominate latency. Nothing is written while
//! the scan runs: embedding, the index write, and the fingerprint record
//! update happen sequentially afterwards, so an interrupted run leaves
//! the previous committed state intact and a rerun picks up where it
//! left off.
//!
//! Per-file isolation is strict: a file that cannot be fetched, parsed,
//! or summarized is logged and skipped, never fatal. Only failing to
//! list the store at all aborts the run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use signpost_extract::{ChunkConfig, ExtractError, extract_text};
use signpost_llm::EmbeddingProvider;
use tracing::{debug, error, info, warn};

use super::fingerprint::{FingerprintRecord, fingerprint};
use super::summarize::Summarizer;
use crate::chunk_index::{ChunkIndex, DocumentChunk};
use crate::store::ContentStore;

/// Tunables for an indexing pass.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Chunk sizing passed to the splitter.
    pub chunking: ChunkConfig,
    /// Bound on concurrent per-file pipelines.
    pub max_workers: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkConfig::default(),
            max_workers: 3,
        }
    }
}

impl IndexerConfig {
    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }
}

/// Counters for one indexing pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexRunStats {
    /// Documents listed by the store.
    pub listed: usize,
    /// Fingerprint matched; nothing to do.
    pub unchanged: usize,
    /// Documents whose chunks were (re)written.
    pub indexed: usize,
    /// Documents that became empty and had their chunks cleared.
    pub cleared: usize,
    pub skipped_fetch: usize,
    pub skipped_unsupported: usize,
    pub skipped_extract: usize,
    pub skipped_summarize: usize,
    /// Embedding or index-write failures during the commit phase.
    pub commit_failures: usize,
    /// Total chunks written this pass.
    pub chunks_written: usize,
}

enum FileResult {
    Unchanged,
    Skipped(SkipKind),
    /// Extraction and summarization succeeded; ready to embed and commit.
    /// An empty chunk list means the document had no indexable text.
    Ready {
        digest: String,
        chunks: Vec<DocumentChunk>,
    },
}

enum SkipKind {
    Fetch,
    Unsupported,
    Extract,
    Summarize,
}

/// Orchestrates change detection, extraction, summarization, chunking,
/// embedding, and the final index commit.
pub struct Indexer {
    store: Arc<dyn ContentStore>,
    index: ChunkIndex,
    embeddings: Arc<dyn EmbeddingProvider>,
    summarizer: Summarizer,
    /// Directory holding the fingerprint record (and typically the index DB).
    state_dir: PathBuf,
    config: IndexerConfig,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn ContentStore>,
        index: ChunkIndex,
        embeddings: Arc<dyn EmbeddingProvider>,
        summarizer: Summarizer,
        state_dir: PathBuf,
        config: IndexerConfig,
    ) -> Self {
        Self {
            store,
            index,
            embeddings,
            summarizer,
            state_dir,
            config,
        }
    }

    /// Run one indexing pass. Safe to re-run at any time; a pass with no
    /// source changes writes nothing.
    pub async fn run(&self) -> Result<IndexRunStats> {
        let names = self.store.list().await.context("listing content store")?;
        let mut record = FingerprintRecord::load(&self.state_dir).await?;
        info!(documents = names.len(), known = record.len(), "starting indexing pass");

        let mut stats = IndexRunStats {
            listed: names.len(),
            ..Default::default()
        };

        // Scan phase: per-file pipelines, bounded concurrency, read-only
        // with respect to the record and the index.
        let outcomes: Vec<(String, FileResult)> = {
            let record = &record;
            futures::stream::iter(names)
                .map(|name| async move {
                    let result = self.process_file(&name, record).await;
                    (name, result)
                })
                .buffer_unordered(self.config.max_workers.max(1))
                .collect()
                .await
        };

        // Commit phase: sequential embed + write per changed source, then
        // one fingerprint record save. A failure here leaves that source's
        // fingerprint untouched so the next run retries it.
        for (name, result) in outcomes {
            match result {
                FileResult::Unchanged => stats.unchanged += 1,
                FileResult::Skipped(SkipKind::Fetch) => stats.skipped_fetch += 1,
                FileResult::Skipped(SkipKind::Unsupported) => stats.skipped_unsupported += 1,
                FileResult::Skipped(SkipKind::Extract) => stats.skipped_extract += 1,
                FileResult::Skipped(SkipKind::Summarize) => stats.skipped_summarize += 1,
                FileResult::Ready { digest, chunks } if chunks.is_empty() => {
                    match self.index.replace_chunks(&name, &[]).await {
                        Ok(()) => {
                            record.set(&name, digest);
                            stats.cleared += 1;
                        }
                        Err(e) => {
                            error!(name, error = %e, "failed to clear chunks");
                            stats.commit_failures += 1;
                        }
                    }
                }
                FileResult::Ready { digest, chunks } => {
                    match self.commit_document(&name, chunks).await {
                        Ok(written) => {
                            record.set(&name, digest);
                            stats.indexed += 1;
                            stats.chunks_written += written;
                        }
                        Err(e) => {
                            error!(name, error = %e, "failed to commit document");
                            stats.commit_failures += 1;
                        }
                    }
                }
            }
        }

        record.save().await.context("saving fingerprint record")?;
        info!(
            indexed = stats.indexed,
            unchanged = stats.unchanged,
            chunks = stats.chunks_written,
            "indexing pass complete"
        );
        Ok(stats)
    }

    async fn process_file(&self, name: &str, record: &FingerprintRecord) -> FileResult {
        let bytes = match self.store.fetch(name).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(name, error = %e, "fetch failed, skipping");
                return FileResult::Skipped(SkipKind::Fetch);
            }
        };

        let digest = fingerprint(&bytes);
        if !record.needs_reindex(name, &digest) {
            debug!(name, "unchanged");
            return FileResult::Unchanged;
        }

        let text = match extract_text(&bytes, name) {
            Ok(text) => text,
            Err(ExtractError::UnsupportedFormat { .. }) => {
                info!(name, "unsupported format, skipping");
                return FileResult::Skipped(SkipKind::Unsupported);
            }
            Err(e) => {
                warn!(name, error = %e, "extraction failed, skipping");
                return FileResult::Skipped(SkipKind::Extract);
            }
        };

        let segments: Vec<String> = self
            .config
            .chunking
            .split_text(&text)
            .into_iter()
            .filter(|segment| !segment.trim().is_empty())
            .collect();
        if segments.is_empty() {
            info!(name, "no indexable text");
            return FileResult::Ready {
                digest,
                chunks: Vec::new(),
            };
        }

        let profile = match self.summarizer.summarize(name, &text).await {
            Ok(profile) => profile,
            Err(e) => {
                // Fingerprint stays stale on purpose: retried next run.
                warn!(name, error = %e, "summarization failed, skipping");
                return FileResult::Skipped(SkipKind::Summarize);
            }
        };

        let mut chunks = Vec::with_capacity(segments.len());
        for segment in segments {
            match DocumentChunk::new(
                name,
                &profile.summary,
                profile.tags.clone(),
                profile.general,
                segment,
            ) {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => {
                    warn!(name, error = %e, "dropping invalid chunk");
                }
            }
        }
        FileResult::Ready { digest, chunks }
    }

    /// Embed a document's chunks in one batch and replace its index rows.
    async fn commit_document(&self, name: &str, chunks: Vec<DocumentChunk>) -> Result<usize> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embedded = self
            .embeddings
            .embed_texts(&texts)
            .await
            .context("embedding chunks")?;
        if embedded.len() != chunks.len() {
            anyhow::bail!(
                "embedding batch returned {} vectors for {} chunks",
                embedded.len(),
                chunks.len()
            );
        }

        let paired: Vec<_> = chunks.into_iter().zip(embedded.embeddings).collect();
        self.index.replace_chunks(name, &paired).await?;
        Ok(paired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use half::f16;
    use signpost_llm::{ChatProvider, EmbeddingResult, RetryPolicy};
    use tempfile::tempdir;

    /// Deterministic embedding: a tiny byte-histogram of the text.
    struct HashEmbed;

    #[async_trait]
    impl EmbeddingProvider for HashEmbed {
        async fn embed_text(&self, text: &str) -> signpost_llm::Result<Vec<f16>> {
            let mut v = [0.0f32; 8];
            for (i, b) in text.bytes().enumerate() {
                v[i % 8] += f32::from(b) / 255.0;
            }
            Ok(v.iter().copied().map(f16::from_f32).collect())
        }

        async fn embed_texts(&self, texts: &[String]) -> signpost_llm::Result<EmbeddingResult> {
            let mut embeddings = Vec::new();
            for text in texts {
                embeddings.push(self.embed_text(text).await?);
            }
            Ok(EmbeddingResult::new(embeddings))
        }
    }

    /// Chat stub: valid profile JSON, except for filenames containing
    /// "flaky" which always fail.
    struct CannedChat;

    #[async_trait]
    impl ChatProvider for CannedChat {
        async fn complete(&self, _system: &str, user: &str) -> signpost_llm::Result<String> {
            if user.contains("flaky") {
                return Err(signpost_llm::LlmError::Api {
                    status: 500,
                    message: "upstream flake".to_string(),
                });
            }
            Ok(r#"{"summary": "A staff resource.", "tags": ["resource"]}"#.to_string())
        }
    }

    fn indexer(store: MemoryStore, index: ChunkIndex, dir: &std::path::Path) -> Indexer {
        let summarizer = Summarizer::new(
            Arc::new(CannedChat),
            RetryPolicy::new(2, std::time::Duration::ZERO),
        );
        Indexer::new(
            Arc::new(store),
            index,
            Arc::new(HashEmbed),
            summarizer,
            dir.to_path_buf(),
            IndexerConfig::default(),
        )
    }

    #[tokio::test]
    async fn rerun_without_changes_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let mut store = MemoryStore::new();
        store.insert("a.txt", b"alpha document text".to_vec());
        store.insert("b.txt", b"beta document text".to_vec());

        let index = ChunkIndex::open_memory().await?;
        let indexer = indexer(store, index.clone(), dir.path());

        let first = indexer.run().await?;
        assert_eq!(first.indexed, 2);
        assert_eq!(first.unchanged, 0);
        let chunks_after_first = index.stats().await?.chunks;

        let second = indexer.run().await?;
        assert_eq!(second.indexed, 0);
        assert_eq!(second.unchanged, 2);
        assert_eq!(index.stats().await?.chunks, chunks_after_first);
        Ok(())
    }

    #[tokio::test]
    async fn changed_file_is_superseded_not_duplicated() -> Result<()> {
        let dir = tempdir()?;
        let mut store = MemoryStore::new();
        store.insert("doc.txt", b"first version".to_vec());

        let index = ChunkIndex::open_memory().await?;
        indexer(store.clone(), index.clone(), dir.path()).run().await?;
        assert_eq!(index.stats().await?.chunks, 1);

        store.insert("doc.txt", b"second version, longer than before".to_vec());
        let stats = indexer(store, index.clone(), dir.path()).run().await?;
        assert_eq!(stats.indexed, 1);

        // Still exactly one source, old chunks gone.
        let index_stats = index.stats().await?;
        assert_eq!(index_stats.sources, 1);
        assert_eq!(index_stats.chunks, 1);
        Ok(())
    }

    #[tokio::test]
    async fn summarize_failure_skips_file_and_keeps_it_pending() -> Result<()> {
        let dir = tempdir()?;
        let mut store = MemoryStore::new();
        store.insert("flaky.txt", b"cannot be summarized".to_vec());
        store.insert("fine.txt", b"summarizes fine".to_vec());

        let index = ChunkIndex::open_memory().await?;
        let stats = indexer(store, index.clone(), dir.path()).run().await?;

        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.skipped_summarize, 1);
        assert_eq!(index.stats().await?.sources, 1);

        // The failed file must not have been fingerprinted.
        let record = FingerprintRecord::load(dir.path()).await?;
        assert!(record.needs_reindex("flaky.txt", &fingerprint(b"cannot be summarized")));
        assert!(!record.needs_reindex("fine.txt", &fingerprint(b"summarizes fine")));
        Ok(())
    }

    #[tokio::test]
    async fn unsupported_and_empty_files_are_handled() -> Result<()> {
        let dir = tempdir()?;
        let mut store = MemoryStore::new();
        store.insert("image.png", vec![0x89, 0x50, 0x4e, 0x47]);
        store.insert("blank.txt", b"   \n  ".to_vec());

        let index = ChunkIndex::open_memory().await?;
        let stats = indexer(store, index.clone(), dir.path()).run().await?;

        assert_eq!(stats.skipped_unsupported, 1);
        assert_eq!(stats.cleared, 1);
        assert_eq!(index.stats().await?.chunks, 0);

        // The empty file's fingerprint advanced: a rerun skips it.
        let record = FingerprintRecord::load(dir.path()).await?;
        assert!(!record.needs_reindex("blank.txt", &fingerprint(b"   \n  ")));
        Ok(())
    }
}

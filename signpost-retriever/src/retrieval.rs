//! Query-time retrieval: rank chunks against the query embedding, merge
//! in the always-included general-purpose documents, and return one
//! download link per source document.
//!
//! The merge policy, in order:
//! 1. the nearest chunks by cosine distance (ascending, an oversampled
//!    pool so deduplication still leaves enough distinct sources),
//! 2. every general-purpose chunk appended with an infinite score, so a
//!    general document can rank on merit but can never be lost,
//! 3. a fixed keyword discount for finite-scored chunks whose filename
//!    or tags contain a query token,
//! 4. stable ascending sort, dedup to the first (best) chunk per source,
//! 5. cut to `top_k`, then append any general documents the cut dropped.
//!
//! The result can therefore exceed `top_k` by the number of general
//! documents; that is deliberate.
//!
//! Retrieval never fails the caller: any error (including a missing
//! index) is logged and produces an empty list.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use signpost_llm::EmbeddingProvider;
use tracing::{debug, warn};

use crate::chunk_index::{ChunkIndex, StoredChunk};

/// A retrieval hit handed to the caller: one source document with its
/// public download URL and indexed summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceLink {
    pub name: String,
    pub url: String,
    pub summary: String,
}

/// Tunables for the merge policy.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// How many chunks to pull from the index before deduplication.
    pub oversample: usize,
    /// Score discount for a query-token match on filename or tags.
    pub keyword_boost: f32,
    /// Query tokens shorter than this are ignored for boosting.
    pub min_token_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            oversample: 15,
            keyword_boost: 0.25,
            min_token_len: 3,
        }
    }
}

/// Finds relevant resource documents for a user query.
pub struct ResourceFinder {
    /// `None` when no index has been built yet; every query then resolves
    /// to an empty result rather than an error.
    index: Option<ChunkIndex>,
    embeddings: Arc<dyn EmbeddingProvider>,
    /// Base URL that per-document download links are joined onto.
    download_base: String,
    config: RetrievalConfig,
}

impl ResourceFinder {
    pub fn new(
        index: Option<ChunkIndex>,
        embeddings: Arc<dyn EmbeddingProvider>,
        download_base: impl Into<String>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embeddings,
            download_base: download_base.into(),
            config,
        }
    }

    /// Resolve a query to at most `top_k` ranked documents plus every
    /// general-purpose document. Infallible: failures log and return
    /// an empty list so the caller can always render *something*.
    pub async fn find(&self, query: &str, top_k: usize) -> Vec<ResourceLink> {
        match self.try_find(query, top_k).await {
            Ok(links) => links,
            Err(e) => {
                warn!(query, error = %e, "retrieval failed, returning no resources");
                Vec::new()
            }
        }
    }

    async fn try_find(&self, query: &str, top_k: usize) -> Result<Vec<ResourceLink>> {
        let Some(index) = &self.index else {
            debug!("no index available, returning no resources");
            return Ok(Vec::new());
        };

        let query_embedding = self
            .embeddings
            .embed_text(query)
            .await
            .context("embedding query")?;

        let ranked = index
            .search(&query_embedding, self.config.oversample.max(top_k))
            .await?;
        let general = index.general_chunks().await?;

        let merged = merge_results(ranked, general, query, top_k, &self.config);
        debug!(query, results = merged.len(), "resolved query");

        Ok(merged
            .into_iter()
            .map(|chunk| ResourceLink {
                url: download_url(&self.download_base, &chunk.source_name),
                name: chunk.source_name,
                summary: chunk.summary,
            })
            .collect())
    }
}

/// Public download link for one document (no access token; the container
/// serves reads anonymously at this base).
fn download_url(base: &str, name: &str) -> String {
    match reqwest::Url::parse(base) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                for segment in name.split('/') {
                    segments.push(segment);
                }
            }
            url.to_string()
        }
        Err(_) => format!("{}/{}", base.trim_end_matches('/'), name),
    }
}

/// The merge policy itself, separated from I/O so it can be tested on
/// hand-built inputs.
fn merge_results(
    ranked: Vec<(f32, StoredChunk)>,
    general: Vec<StoredChunk>,
    query: &str,
    top_k: usize,
    config: &RetrievalConfig,
) -> Vec<StoredChunk> {
    let tokens = query_tokens(query, config.min_token_len);

    let mut pool = ranked;
    // A general document's chunks may already be in the ranked pool with
    // a real score; these sentinel copies only guarantee presence.
    for chunk in &general {
        pool.push((f32::INFINITY, chunk.clone()));
    }

    for (score, chunk) in pool.iter_mut() {
        if score.is_finite() && keyword_match(chunk, &tokens) {
            *score -= config.keyword_boost;
        }
    }

    // Stable sort: equal scores keep ranked-then-general order.
    pool.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut seen = HashSet::new();
    let mut merged: Vec<StoredChunk> = Vec::new();
    for (_, chunk) in pool {
        if seen.insert(chunk.source_name.clone()) {
            merged.push(chunk);
        }
    }

    let mut result: Vec<StoredChunk> = Vec::new();
    let mut included = HashSet::new();
    for chunk in merged.into_iter().take(top_k) {
        included.insert(chunk.source_name.clone());
        result.push(chunk);
    }

    // Re-attach general documents the cut dropped, in index order.
    for chunk in general {
        if included.insert(chunk.source_name.clone()) {
            result.push(chunk);
        }
    }

    result
}

/// Lowercased alphanumeric query tokens at or above the length floor.
fn query_tokens(query: &str, min_len: usize) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= min_len)
        .map(str::to_string)
        .collect()
}

fn keyword_match(chunk: &StoredChunk, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    let name = chunk.source_name.to_lowercase();
    tokens.iter().any(|token| {
        name.contains(token)
            || chunk
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(token))
    })
}

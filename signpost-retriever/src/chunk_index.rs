//! The persisted vector index of document chunks.
//!
//! Chunks and their embeddings live in a single SQLite database. The
//! autoincrement row id preserves insertion order, which doubles as the
//! tie-break for equal similarity scores, and appending new documents
//! never requires a rebuild. The database file is the whole persisted
//! index: reopening it across process restarts restores the index as of
//! the last committed indexing pass.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE chunks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     source_name TEXT,     -- blob name of the source document
//!     summary TEXT,         -- document-level, identical across a source
//!     tags TEXT,            -- JSON array of lowercase tags
//!     general INTEGER,      -- general-purpose flag, computed at index time
//!     content TEXT,         -- the chunk text
//!     embedding BLOB,       -- f16 vector
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//! ```
//!
//! Scores returned by [`ChunkIndex::search`] are cosine *distances*
//! (`1 - cosine similarity`): lower is more similar, and results come
//! back ascending.

use std::path::Path;

use anyhow::{Context, Result, bail};
use half::f16;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};

pub const INDEX_DB_FILE: &str = "signpost-index.db";

/// A text segment of a source document plus its document-level metadata.
///
/// Every chunk derived from the same source carries the same summary,
/// tags, and general-purpose flag; only `content` differs.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// Name of the source document within the content store.
    pub source_name: String,
    /// Short human-readable synopsis (1-3 sentences).
    pub summary: String,
    /// Lowercase topical tags.
    pub tags: Vec<String>,
    /// Whether this document is flagged always-relevant.
    pub general: bool,
    /// The chunk text itself.
    pub content: String,
}

impl DocumentChunk {
    /// Build a chunk, rejecting records that could never be retrieved.
    pub fn new(
        source_name: impl Into<String>,
        summary: impl Into<String>,
        tags: Vec<String>,
        general: bool,
        content: impl Into<String>,
    ) -> Result<Self> {
        let source_name = source_name.into();
        let content = content.into();
        if source_name.trim().is_empty() {
            bail!("document chunk requires a source name");
        }
        if content.trim().is_empty() {
            bail!("document chunk requires non-empty content");
        }
        Ok(Self {
            source_name,
            summary: summary.into(),
            tags,
            general,
            content,
        })
    }
}

/// A chunk as stored in the index, with its row id and embedding.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: i64,
    pub source_name: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub general: bool,
    pub content: String,
    pub embedding: Vec<f16>,
}

/// Aggregate counts for diagnostics.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub chunks: usize,
    pub sources: usize,
    pub general_sources: usize,
}

/// Handle to the SQLite-backed chunk index.
///
/// One handle is created at startup and passed explicitly to the indexer
/// (writes) and the resource finder (reads); there is no process-global
/// index state.
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    pool: SqlitePool,
}

impl ChunkIndex {
    /// Open (creating if missing) the index under `base`.
    pub async fn open(base: &Path) -> Result<Self> {
        let db_path = base.join(INDEX_DB_FILE);
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .create_if_missing(true),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Open an existing index, failing if none has been built yet.
    /// Query paths use this so "no index" is distinguishable from "empty".
    pub async fn open_existing(base: &Path) -> Result<Self> {
        let db_path = base.join(INDEX_DB_FILE);
        if !db_path.exists() {
            bail!("no index found at {}", db_path.display());
        }
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// In-memory index for tests.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_name TEXT NOT NULL,
                summary TEXT NOT NULL,
                tags TEXT NOT NULL,
                general INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_name)")
            .execute(&pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_general ON chunks(general)")
            .execute(&pool)
            .await?;
        Ok(Self { pool })
    }

    /// Replace all chunks for one source document in a single transaction.
    ///
    /// Deleting first means re-indexing a changed file supersedes its old
    /// chunks instead of accumulating duplicates; an empty `chunks` slice
    /// just clears the source (the document became empty or was retired).
    pub async fn replace_chunks(
        &self,
        source_name: &str,
        chunks: &[(DocumentChunk, Vec<f16>)],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE source_name = ?1")
            .bind(source_name)
            .execute(&mut *tx)
            .await?;

        for (chunk, embedding) in chunks {
            if chunk.source_name != source_name {
                bail!(
                    "chunk for {} given to replace_chunks({})",
                    chunk.source_name,
                    source_name
                );
            }
            let tags_json = serde_json::to_string(&chunk.tags)?;
            let embedding_bytes = bytemuck::cast_slice::<f16, u8>(embedding);
            sqlx::query(
                r#"
                INSERT INTO chunks (source_name, summary, tags, general, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&chunk.source_name)
            .bind(&chunk.summary)
            .bind(tags_json)
            .bind(chunk.general as i64)
            .bind(&chunk.content)
            .bind(embedding_bytes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// The `limit` chunks closest to `query_embedding` by cosine distance,
    /// ascending; ties keep insertion order.
    pub async fn search(
        &self,
        query_embedding: &[f16],
        limit: usize,
    ) -> Result<Vec<(f32, StoredChunk)>> {
        let rows = sqlx::query(
            "SELECT id, source_name, summary, tags, general, content, embedding
             FROM chunks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, StoredChunk)> = Vec::with_capacity(rows.len());
        for row in rows {
            let chunk = row_to_chunk(&row)?;
            let distance = cosine_distance(query_embedding, &chunk.embedding);
            scored.push((distance, chunk));
        }

        // sort_by is stable, so equal distances keep id order.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(limit);
        Ok(scored)
    }

    /// All chunks whose document was flagged general-purpose, in insertion
    /// order. This is the explicit enumeration used by the retrieval
    /// merge policy; general documents are never found via a probe query.
    pub async fn general_chunks(&self) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(
            "SELECT id, source_name, summary, tags, general, content, embedding
             FROM chunks WHERE general = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_chunk).collect()
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let sources: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT source_name) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let general_sources: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT source_name) FROM chunks WHERE general = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(IndexStats {
            chunks: chunks as usize,
            sources: sources as usize,
            general_sources: general_sources as usize,
        })
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<StoredChunk> {
    let tags_json: String = row.get("tags");
    let tags: Vec<String> =
        serde_json::from_str(&tags_json).context("decoding stored chunk tags")?;
    let embedding_bytes: Vec<u8> = row.get("embedding");
    let embedding = bytemuck::cast_slice::<u8, f16>(&embedding_bytes).to_vec();
    let general: i64 = row.get("general");

    Ok(StoredChunk {
        id: row.get("id"),
        source_name: row.get("source_name"),
        summary: row.get("summary"),
        tags,
        general: general != 0,
        content: row.get("content"),
        embedding,
    })
}

/// Cosine distance between two f16 vectors: `1 - cosine similarity`.
/// Mismatched lengths or zero vectors score the neutral distance 1.0.
pub fn cosine_distance(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }

    let dot: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f32::from(*x) * f32::from(*y))
        .sum();
    let norm_a: f32 = a.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed(values: &[f32]) -> Vec<f16> {
        values.iter().copied().map(f16::from_f32).collect()
    }

    fn chunk(source: &str, content: &str, general: bool) -> DocumentChunk {
        DocumentChunk::new(source, format!("sum-{source}"), vec!["tag".into()], general, content)
            .unwrap()
    }

    #[test]
    fn chunk_construction_is_validated() {
        assert!(DocumentChunk::new("", "s", vec![], false, "text").is_err());
        assert!(DocumentChunk::new("a.pdf", "s", vec![], false, "  ").is_err());
        assert!(DocumentChunk::new("a.pdf", "s", vec![], false, "text").is_ok());
    }

    #[test]
    fn cosine_distance_semantics() {
        let a = embed(&[1.0, 0.0]);
        let b = embed(&[0.0, 1.0]);
        let c = embed(&[1.0, 0.0]);
        assert!(cosine_distance(&a, &c) < 1e-3); // identical → ~0
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-3); // orthogonal → 1
        assert_eq!(cosine_distance(&a, &embed(&[0.0, 0.0])), 1.0); // zero vector
        assert_eq!(cosine_distance(&a, &embed(&[1.0])), 1.0); // length mismatch
    }

    #[tokio::test]
    async fn search_orders_ascending_by_distance() -> Result<()> {
        let index = ChunkIndex::open_memory().await?;
        index
            .replace_chunks(
                "far.txt",
                &[(chunk("far.txt", "far away", false), embed(&[0.0, 1.0]))],
            )
            .await?;
        index
            .replace_chunks(
                "near.txt",
                &[(chunk("near.txt", "right there", false), embed(&[1.0, 0.1]))],
            )
            .await?;

        let results = index.search(&embed(&[1.0, 0.0]), 10).await?;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.source_name, "near.txt");
        assert_eq!(results[1].1.source_name, "far.txt");
        assert!(results[0].0 < results[1].0);
        Ok(())
    }

    #[tokio::test]
    async fn replace_chunks_supersedes_previous_content() -> Result<()> {
        let index = ChunkIndex::open_memory().await?;
        let old = vec![
            (chunk("doc.txt", "old one", false), embed(&[1.0, 0.0])),
            (chunk("doc.txt", "old two", false), embed(&[1.0, 0.0])),
        ];
        index.replace_chunks("doc.txt", &old).await?;

        let new = vec![(chunk("doc.txt", "new", false), embed(&[0.0, 1.0]))];
        index.replace_chunks("doc.txt", &new).await?;

        let stats = index.stats().await?;
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.sources, 1);

        let results = index.search(&embed(&[0.0, 1.0]), 10).await?;
        assert_eq!(results[0].1.content, "new");
        Ok(())
    }

    #[tokio::test]
    async fn replace_with_empty_clears_source() -> Result<()> {
        let index = ChunkIndex::open_memory().await?;
        index
            .replace_chunks("gone.txt", &[(chunk("gone.txt", "x", false), embed(&[1.0]))])
            .await?;
        index.replace_chunks("gone.txt", &[]).await?;
        assert_eq!(index.stats().await?.chunks, 0);
        Ok(())
    }

    #[tokio::test]
    async fn general_chunks_only_returns_flagged_sources() -> Result<()> {
        let index = ChunkIndex::open_memory().await?;
        index
            .replace_chunks(
                "specific.txt",
                &[(chunk("specific.txt", "a", false), embed(&[1.0]))],
            )
            .await?;
        index
            .replace_chunks(
                "general_guide.txt",
                &[(chunk("general_guide.txt", "b", true), embed(&[1.0]))],
            )
            .await?;

        let general = index.general_chunks().await?;
        assert_eq!(general.len(), 1);
        assert_eq!(general[0].source_name, "general_guide.txt");
        assert!(general[0].general);

        let stats = index.stats().await?;
        assert_eq!(stats.general_sources, 1);
        assert_eq!(stats.sources, 2);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_mismatched_source_names() -> Result<()> {
        let index = ChunkIndex::open_memory().await?;
        let result = index
            .replace_chunks("a.txt", &[(chunk("b.txt", "wrong", false), embed(&[1.0]))])
            .await;
        assert!(result.is_err());
        Ok(())
    }
}

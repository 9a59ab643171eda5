//! Content fingerprints and the persisted fingerprint record.
//!
//! A document is re-indexed if and only if its current blake3 digest
//! differs from (or is missing from) the record of the last successful
//! pass. The record is a plain JSON document mapping blob name to hex
//! digest; it is owned exclusively by the indexer and rewritten once at
//! the end of a run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const FINGERPRINT_FILE: &str = "fingerprints.json";

/// Hex-encoded blake3 digest of a document's bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Mapping from document name to the digest it carried when last indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRecord {
    #[serde(skip)]
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FingerprintRecord {
    /// Load the record from `base`, treating a missing file as an empty
    /// record (first run).
    pub async fn load(base: &Path) -> Result<Self> {
        let path = base.join(FINGERPRINT_FILE);
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing fingerprint record {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("reading fingerprint record {}", path.display())
                });
            }
        };
        Ok(Self { path, entries })
    }

    /// Persist the record, replacing the previous file atomically so a
    /// crash mid-write cannot corrupt it.
    pub async fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    /// True iff `digest` differs from the recorded one, or `name` has
    /// never been recorded. No false negatives: any change re-indexes.
    pub fn needs_reindex(&self, name: &str, digest: &str) -> bool {
        self.entries.get(name).map(String::as_str) != Some(digest)
    }

    /// Record a successful indexing pass for `name`. Called only after
    /// the document's chunks are committed.
    pub fn set(&mut self, name: &str, digest: String) {
        self.entries.insert(name.to_string(), digest);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn identical_bytes_identical_digest() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
    }

    #[tokio::test]
    async fn empty_record_always_needs_reindex() -> Result<()> {
        let dir = tempdir()?;
        let record = FingerprintRecord::load(dir.path()).await?;
        assert!(record.is_empty());
        assert!(record.needs_reindex("anything.pdf", &fingerprint(b"x")));
        Ok(())
    }

    #[tokio::test]
    async fn matching_digest_skips_reindex() -> Result<()> {
        let dir = tempdir()?;
        let mut record = FingerprintRecord::load(dir.path()).await?;
        let digest = fingerprint(b"stable content");
        record.set("doc.pdf", digest.clone());

        assert!(!record.needs_reindex("doc.pdf", &digest));
        assert!(record.needs_reindex("doc.pdf", &fingerprint(b"changed")));
        assert!(record.needs_reindex("other.pdf", &digest));
        Ok(())
    }

    #[tokio::test]
    async fn record_round_trips_through_disk() -> Result<()> {
        let dir = tempdir()?;
        let mut record = FingerprintRecord::load(dir.path()).await?;
        record.set("a.txt", fingerprint(b"a"));
        record.set("b.txt", fingerprint(b"b"));
        record.save().await?;

        let reloaded = FingerprintRecord::load(dir.path()).await?;
        assert_eq!(reloaded.len(), 2);
        assert!(!reloaded.needs_reindex("a.txt", &fingerprint(b"a")));
        Ok(())
    }
}

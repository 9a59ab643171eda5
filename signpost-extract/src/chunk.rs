//! Overlapping fixed-size text chunking.
//!
//! Extracted document text is split into character windows of a target
//! length, each window sharing a fixed overlap with its predecessor so
//! that sentences straddling a boundary remain searchable. Splitting is
//! done on `char` boundaries, never byte offsets, so multi-byte input is
//! safe.

/// Configuration for the chunker.
///
/// Defaults match the sizes the resource corpus was originally indexed
/// with: 1000-character chunks with 200 characters of overlap.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkConfig {
    /// Create a config, clamping the overlap so a window always advances.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split `text` into overlapping segments.
    ///
    /// Empty (or whitespace-only) input yields no chunks; any other input
    /// yields at least one. The final chunk may be shorter than
    /// `chunk_size`.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let size = self.chunk_size.max(1);
        let step = size - self.chunk_overlap.min(size - 1);

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

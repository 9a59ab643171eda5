//! Plain-text extraction and chunking for office documents.
//!
//! This crate is the leaf of the signpost workspace: it turns the raw bytes
//! of a downloaded resource (PDF, Word document, slide deck, or plain text)
//! into plain text, and splits that text into overlapping segments suitable
//! for embedding. It performs no I/O of its own — callers hand it bytes and
//! a filename.
//!
//! The extraction contract is deliberately simple:
//!
//! - the format is chosen from the filename extension alone;
//! - an unrecognized extension is an [`ExtractError::UnsupportedFormat`];
//! - a parser failure on a recognized format is an [`ExtractError::Parse`];
//! - plain text never fails: undecodable bytes are replaced, not rejected.
//!
//! Concatenation order always follows source order: pages for PDFs,
//! paragraphs for Word documents, slides-then-shapes for decks.
//!
//! ```
//! use signpost_extract::{extract_text, ChunkConfig};
//!
//! let text = extract_text(b"quarterly review notes", "notes.txt").unwrap();
//! let chunks = ChunkConfig::default().split_text(&text);
//! assert_eq!(chunks.len(), 1);
//! ```

pub mod chunk;
pub mod error;
mod ooxml;
mod pdf;

pub use chunk::ChunkConfig;
pub use error::ExtractError;

/// The document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Pptx,
    Txt,
}

impl DocumentFormat {
    /// Determine the format from a filename extension, case-insensitively.
    /// Returns `None` for anything outside {pdf, docx, pptx, txt}.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext)?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Txt => "txt",
        };
        f.write_str(name)
    }
}

/// Extract plain text from raw document bytes.
///
/// The format is derived from `name`'s extension. No size limit is applied
/// here; truncation for LLM budgets happens downstream.
pub fn extract_text(bytes: &[u8], name: &str) -> Result<String, ExtractError> {
    let format = DocumentFormat::from_name(name).ok_or_else(|| ExtractError::UnsupportedFormat {
        filename: name.to_string(),
    })?;

    match format {
        DocumentFormat::Pdf => pdf::extract(bytes),
        DocumentFormat::Docx => ooxml::extract_docx(bytes),
        DocumentFormat::Pptx => ooxml::extract_pptx(bytes),
        DocumentFormat::Txt => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

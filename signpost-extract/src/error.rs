//! Error types for document extraction.

/// Errors produced while turning document bytes into plain text.
///
/// The two variants matter to callers in different ways: an unsupported
/// format means the file should simply be skipped, while a parse failure
/// on a recognized format is worth logging since the file was expected
/// to be readable.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The filename extension is not one of {pdf, docx, pptx, txt}.
    #[error("unsupported document format: {filename}")]
    UnsupportedFormat { filename: String },

    /// The format was recognized but the parser could not read the bytes.
    #[error("failed to parse {format} content: {message}")]
    Parse { format: crate::DocumentFormat, message: String },
}

impl ExtractError {
    pub(crate) fn parse<E: std::fmt::Display>(format: crate::DocumentFormat, source: E) -> Self {
        Self::Parse {
            format,
            message: source.to_string(),
        }
    }
}

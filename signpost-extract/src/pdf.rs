//! PDF text extraction backed by `pdf-extract`.

use crate::{DocumentFormat, ExtractError};

/// Extract the text of every page, concatenated in page order.
/// `pdf-extract` already walks pages sequentially, so its output order
/// matches the source.
pub(crate) fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractError::parse(DocumentFormat::Pdf, e))
}

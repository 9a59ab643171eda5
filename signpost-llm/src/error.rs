//! Error types for language-model calls.

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Failures when talking to the completion or embedding API.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("HTTP request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The API answered 2xx but the payload was not usable.
    #[error("invalid response from provider: {message}")]
    InvalidResponse { message: String },
}

impl LlmError {
    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    /// Client-side errors (4xx other than 429) are not retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse { .. } => true,
        }
    }
}

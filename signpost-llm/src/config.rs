//! Configuration for LLM providers and retry behavior.

use std::time::Duration;

/// Connection settings for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the API, without a trailing slash.
    pub api_base: String,
    /// Bearer token for authentication.
    pub api_key: String,
    /// Model used for chat completions (summaries and tags).
    pub chat_model: String,
    /// Model used for text embeddings.
    pub embedding_model: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_chat_model<S: Into<String>>(mut self, model: S) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_embedding_model<S: Into<String>>(mut self, model: S) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// An explicit retry policy: how many attempts a caller makes and how
/// long it waits between them. Passed into call sites that need
/// resilience rather than being baked into any one client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (so 3 means 2 retries).
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries; used on latency-sensitive paths.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

//! # signpost-llm
//!
//! Language-model provider clients for the signpost workspace: chat
//! completions (used to summarize and tag documents) and text embeddings
//! (used to build and query the vector index), both over an
//! OpenAI-compatible HTTP API.
//!
//! The crate exposes two small traits, [`ChatProvider`] and
//! [`EmbeddingProvider`], so the indexing and retrieval code never
//! depends on a concrete backend — tests substitute deterministic
//! in-process implementations. [`OpenAiClient`] implements both.
//!
//! Retry behavior is deliberately *not* baked into the clients. Callers
//! that need resilience (the summarizer does, the query path does not)
//! apply a [`RetryPolicy`] themselves, so each call site decides how many
//! failures it can absorb.
//!
//! ## Quick start
//!
//! ```no_run
//! use signpost_llm::{LlmConfig, OpenAiClient, EmbeddingProvider};
//!
//! # async fn example() -> Result<(), signpost_llm::LlmError> {
//! let client = OpenAiClient::new(LlmConfig::new("sk-..."))?;
//! let result = client.embed_texts(&["checklist for interviews".into()]).await?;
//! println!("dimension: {}", result.dimension);
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod config;
pub mod embedding;
pub mod error;

pub use chat::ChatProvider;
pub use config::{LlmConfig, RetryPolicy};
pub use embedding::{EmbeddingProvider, EmbeddingResult};
pub use error::{LlmError, Result};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Client for an OpenAI-compatible API, implementing both provider traits.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(LlmError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// POST a JSON body to `{api_base}/{path}`, mapping non-2xx responses
    /// to [`LlmError::Api`] with whatever message body the server sent.
    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{}", self.config.api_base.trim_end_matches('/'), path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

/// Sleep for the fixed backoff between retry attempts.
///
/// Split out as a free function so callers outside this crate can apply a
/// [`RetryPolicy`] without re-implementing the wait.
pub async fn backoff_sleep(policy: &RetryPolicy) {
    if policy.backoff > Duration::ZERO {
        tokio::time::sleep(policy.backoff).await;
    }
}

//! Embedding provider.

use async_trait::async_trait;
use half::f16;
use serde::{Deserialize, Serialize};

use crate::OpenAiClient;
use crate::error::{LlmError, Result};

/// Result of embedding generation.
///
/// Embeddings are stored as `f16` to halve the footprint of the persisted
/// index; the precision loss is negligible for cosine ranking.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f16>>,
    /// Dimension of each vector (0 if empty).
    pub dimension: usize,
}

impl EmbeddingResult {
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding backends: text in, fixed-dimension vector out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let result = self.embed_texts(std::slice::from_ref(&text.to_string())).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::invalid_response("embedding response was empty"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(Vec::new()));
        }

        let request = EmbeddingRequest {
            model: &self.config().embedding_model,
            input: texts,
        };

        tracing::debug!(
            model = %self.config().embedding_model,
            batch = texts.len(),
            "requesting embeddings"
        );
        let mut response: EmbeddingResponse = self.post_json("embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(LlmError::invalid_response(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The API documents data as index-ordered; sort to make it certain.
        response.data.sort_by_key(|datum| datum.index);
        let embeddings = response
            .data
            .into_iter()
            .map(|datum| datum.embedding.into_iter().map(f16::from_f32).collect())
            .collect();
        Ok(EmbeddingResult::new(embeddings))
    }
}

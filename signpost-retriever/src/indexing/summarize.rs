//! Document summarization and tagging via the chat provider.
//!
//! Each document gets a short synopsis and a small tag set from one chat
//! completion over a bounded prefix of its text. The call is retried
//! under an explicit [`RetryPolicy`]; invalid output (empty summary,
//! empty tags, unparseable JSON) counts as a failed attempt, because
//! models occasionally return junk once and clean JSON on the next try.
//!
//! The derived "general-purpose" flag is computed here, at indexing time,
//! so the retrieval merge policy can rely on a stored boolean instead of
//! re-deriving it per query.

use std::sync::Arc;

use serde::Deserialize;
use signpost_llm::{ChatProvider, LlmError, RetryPolicy, backoff_sleep};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You catalogue resource documents for university staff. \
Given a document's filename and text, reply with strict JSON only, no prose and no \
code fences: {\"summary\": \"1-3 sentence synopsis\", \"tags\": [\"up to five short \
lowercase topical tags\"]}";

/// Maximum tags kept per document; the marker tag may be appended after.
const MAX_TAGS: usize = 5;

/// Marker substrings that flag a document as general-purpose.
const GENERAL_MARKERS: [&str; 2] = ["general", "main"];

/// Document-level metadata produced by the summarizer.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentProfile {
    pub summary: String,
    pub tags: Vec<String>,
    pub general: bool,
}

/// Failure of the summarize/tag step for one document. The caller skips
/// the document and leaves its fingerprint untouched so it is retried on
/// the next indexing run.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("language model call failed: {source}")]
    Llm {
        #[from]
        source: LlmError,
    },

    #[error("model output was unusable: {message}")]
    InvalidOutput { message: String },

    #[error("summarization failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Summarizer/tagger over any [`ChatProvider`].
pub struct Summarizer {
    chat: Arc<dyn ChatProvider>,
    retry: RetryPolicy,
    max_input_chars: usize,
}

impl Summarizer {
    pub fn new(chat: Arc<dyn ChatProvider>, retry: RetryPolicy) -> Self {
        Self {
            chat,
            retry,
            max_input_chars: 6000,
        }
    }

    /// Cap on how much document text is sent to the model.
    pub fn with_max_input_chars(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Summarize and tag one document.
    pub async fn summarize(&self, name: &str, text: &str) -> Result<DocumentProfile, SummarizeError> {
        let prefix: String = text.chars().take(self.max_input_chars).collect();
        let user = format!("Filename: {name}\n\nDocument text:\n{prefix}");

        let mut last_error = String::new();
        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                backoff_sleep(&self.retry).await;
            }
            match self.attempt(name, &user).await {
                Ok(profile) => {
                    debug!(name, tags = ?profile.tags, general = profile.general, "summarized document");
                    return Ok(profile);
                }
                Err(SummarizeError::Llm { source }) if !source.is_retryable() => {
                    return Err(SummarizeError::Llm { source });
                }
                Err(e) => {
                    warn!(name, attempt, error = %e, "summarize attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(SummarizeError::RetriesExhausted {
            attempts: self.retry.max_attempts,
            last_error,
        })
    }

    async fn attempt(&self, name: &str, user: &str) -> Result<DocumentProfile, SummarizeError> {
        let raw = self.chat.complete(SYSTEM_PROMPT, user).await?;
        parse_profile(&raw, name)
    }
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    summary: String,
    tags: Vec<String>,
}

/// Parse and validate a model response into a [`DocumentProfile`].
fn parse_profile(raw: &str, name: &str) -> Result<DocumentProfile, SummarizeError> {
    let json = strip_code_fences(raw);
    let parsed: RawProfile =
        serde_json::from_str(json).map_err(|e| SummarizeError::InvalidOutput {
            message: format!("not valid profile JSON: {e}"),
        })?;

    let summary = parsed.summary.trim().to_string();
    if summary.is_empty() {
        return Err(SummarizeError::InvalidOutput {
            message: "summary was empty".to_string(),
        });
    }

    let mut tags: Vec<String> = Vec::new();
    for tag in parsed.tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        return Err(SummarizeError::InvalidOutput {
            message: "tag set was empty".to_string(),
        });
    }
    tags.truncate(MAX_TAGS);

    let general = is_general_purpose(&summary, &tags, name);
    if general && !tags.iter().any(|t| t == "general") {
        tags.push("general".to_string());
    }

    Ok(DocumentProfile {
        summary,
        tags,
        general,
    })
}

/// Whether a document should always surface in retrieval results,
/// derived from marker substrings in its summary, tags, or filename.
pub fn is_general_purpose(summary: &str, tags: &[String], filename: &str) -> bool {
    let summary = summary.to_lowercase();
    let filename = filename.to_lowercase();
    GENERAL_MARKERS.iter().any(|marker| {
        summary.contains(marker)
            || filename.contains(marker)
            || tags.iter().any(|tag| tag.to_lowercase().contains(marker))
    })
}

/// Models sometimes wrap JSON in Markdown fences despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

//! Chat completion provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::OpenAiClient;
use crate::error::{LlmError, Result};

/// Trait for chat-completion backends: prompt in, text out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one completion with a system prompt and a user message,
    /// returning the assistant's text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config().chat_model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            // Low temperature: summaries and tags should be reproducible.
            temperature: 0.2,
        };

        tracing::debug!(model = %self.config().chat_model, "requesting chat completion");
        let response: ChatResponse = self.post_json("chat/completions", &request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::invalid_response("completion had no choices"))?;

        if content.trim().is_empty() {
            return Err(LlmError::invalid_response("completion content was empty"));
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_parses_standard_payload() {
        let payload = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "A short summary."},
                 "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let response: ChatResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("A short summary.")
        );
    }

    #[test]
    fn chat_response_tolerates_null_content() {
        let payload = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let response: ChatResponse = serde_json::from_str(payload).unwrap();
        assert!(response.choices[0].message.content.is_none());
    }

    #[test]
    fn chat_request_serializes_messages_in_order() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ChatMessage { role: "system", content: "sys" },
                ChatMessage { role: "user", content: "usr" },
            ],
            temperature: 0.2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
    }
}

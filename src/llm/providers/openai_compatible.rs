//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Covers OpenAI and any endpoint implementing the same wire protocol.
//! All wire types are private to this module — callers only see
//! [`crate::llm::LlmMetadata`] and plain strings. Transient failures
//! (transport, 429, 5xx) are retried with exponential backoff; auth and
//! other client errors surface immediately.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::llm::{extract_json_block, LlmMetadata, ProviderError};

const MAX_ATTEMPTS: u32 = 3;

const SUMMARY_SYSTEM: &str = "You are a helpful assistant that creates concise, \
    accurate summaries. Respond only with the summary text.";
const SUMMARY_MAX_TOKENS: u32 = 150;

const METADATA_SYSTEM: &str = "You are a helpful assistant that extracts structured \
    metadata. Respond only with valid JSON. No markdown. No extra text.";
const METADATA_MAX_TOKENS: u32 = 300;
const METADATA_TEMPERATURE: f32 = 0.1;

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    /// Generate an exactly-two-sentence summary of `text`.
    pub async fn summarize(&self, text: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Summarize the following text in exactly 2 sentences. \
             Be concise and accurate.\n\nText: {text}\n\nSummary:"
        );
        self.chat(SUMMARY_SYSTEM, &prompt, self.temperature, SUMMARY_MAX_TOKENS)
            .await
    }

    /// Extract `{title, topics, sentiment}` metadata from `text`.
    ///
    /// The completion is expected to be a single JSON object; anything
    /// wrapped around it is stripped before parsing, and the parsed value is
    /// normalized by [`LlmMetadata::from_json`].
    pub async fn extract_metadata(&self, text: &str) -> Result<LlmMetadata, ProviderError> {
        let prompt = format!(
            "Analyze the following text and extract metadata. Respond ONLY with a \
             valid JSON object containing these exact fields:\n\
             - title: A descriptive, specific title that captures the main topic \
             (max 50 chars)\n\
             - topics: An array of exactly 3 key topics/themes (max 20 chars each)\n\
             - sentiment: One of: \"positive\", \"neutral\", or \"negative\"\n\n\
             Text: {text}\n\nJSON:"
        );
        let content = self
            .chat(METADATA_SYSTEM, &prompt, METADATA_TEMPERATURE, METADATA_MAX_TOKENS)
            .await?;

        let value = extract_json_block(&content).ok_or_else(|| {
            ProviderError::Malformed(format!(
                "completion is not a JSON object ({} chars)",
                content.chars().count()
            ))
        })?;

        Ok(LlmMetadata::from_json(&value))
    }

    /// One chat completion with retry.
    async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_chat(system, user, temperature, max_tokens).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < MAX_ATTEMPTS && e.is_retryable() => {
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    warn!(
                        attempt,
                        max_attempts = MAX_ATTEMPTS,
                        backoff_secs = backoff.as_secs(),
                        error = %e,
                        "LLM request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single round-trip, no retry.
    async fn try_chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message { role: "system", content: system.to_string() },
                Message { role: "user", content: user.to_string() },
            ],
            temperature: effective_temperature(&self.model, temperature),
            max_tokens: Some(max_tokens),
        };

        debug!(
            model = %payload.model,
            temperature = ?payload.temperature,
            content_len = user.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let response = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
                ProviderError::Transport(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Malformed(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received LLM response");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ProviderError::EmptyCompletion)
    }
}

/// Some models (gpt-5 family) reject the temperature parameter entirely.
fn effective_temperature(model: &str, temperature: f32) -> Option<f32> {
    if model.starts_with("gpt-5") {
        None
    } else {
        Some(temperature)
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env
            .error
            .code
            .map(|v| match v {
                serde_json::Value::String(s) => format!(" [code={s}]"),
                other => format!(" [code={other}]"),
            })
            .unwrap_or_default();
        format!("{}{code}", env.error.message)
    } else {
        body
    };

    error!(status = status.as_u16(), %message, "LLM request returned HTTP error");
    Err(ProviderError::Status { status: status.as_u16(), message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_wire_type_deserializes() {
        let raw = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Two sentences."}}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Two sentences."));
    }

    #[test]
    fn response_with_null_content_deserializes() {
        let raw = r#"{"choices": [{"message": {"content": null}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn error_envelope_deserializes() {
        let raw = r#"{"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}"#;
        let env: ErrorEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.error.message, "Rate limit reached");
    }

    #[test]
    fn request_omits_none_fields() {
        let payload = ChatCompletionRequest {
            model: "gpt-5-mini".into(),
            messages: vec![Message { role: "user", content: "hi".into() }],
            temperature: effective_temperature("gpt-5-mini", 0.3),
            max_tokens: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }

    #[test]
    fn temperature_kept_for_other_models() {
        assert_eq!(effective_temperature("gpt-4o-mini", 0.3), Some(0.3));
        assert_eq!(effective_temperature("gpt-5-mini", 0.3), None);
    }

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::Transport("timeout".into()).is_retryable());
        assert!(ProviderError::Status { status: 429, message: String::new() }.is_retryable());
        assert!(ProviderError::Status { status: 503, message: String::new() }.is_retryable());
        assert!(!ProviderError::Status { status: 401, message: String::new() }.is_retryable());
        assert!(!ProviderError::EmptyCompletion.is_retryable());
    }
}

//! Anthropic Messages API client and tolerant response parsing
//!
//! The rest of the crate talks to the LLM through [`LlmClient::complete`]:
//! system instruction plus user prompt in, first text block out. Structured
//! (JSON) completions go through [`parse_structured_llm_response`], which
//! recovers objects from markdown-fenced or prose-wrapped output.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// LLM-specific error types
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Completion contained no text content")]
    EmptyCompletion,

    #[error("Could not recover a JSON object from completion: {0}")]
    ResponseParseError(String),
}

/// Thin client for the Anthropic Messages API.
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            max_tokens,
        }
    }

    /// Single-turn completion: returns the first text block, trimmed.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0,
            "system": system,
            "messages": [{"role": "user", "content": prompt}],
        });

        debug!(model = %self.model, prompt_length = prompt.len(), "Sending completion request");
        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "LLM request failed");
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let completion: MessagesResponse = response.json().await?;
        let text = completion
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or(LlmError::EmptyCompletion)?;

        debug!(completion_length = text.len(), "Completion received");
        Ok(text.trim().to_string())
    }

    /// Answer a follow-up question scoped to the known destination.
    pub async fn answer_destination_question(
        &self,
        query: &str,
        destination: &str,
    ) -> Result<String, LlmError> {
        let system = format!(
            "You are a knowledgeable travel guide. The user is planning a trip to {destination}. \
             Answer their questions about {destination} concisely and practically."
        );
        self.complete(&system, query).await
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Recover a JSON object from a loosely formatted LLM completion.
///
/// Two-stage policy: strip markdown code fences and try a direct parse; on
/// failure, take the widest `{...}` span in the raw text and parse that. If
/// neither stage yields an object the caller gets a parse error.
pub fn parse_structured_llm_response(raw: &str) -> Result<Value, LlmError> {
    let stripped = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        if value.is_object() {
            return Ok(value);
        }
    }

    let object_span = Regex::new(r"(?s)\{.*\}").unwrap();
    if let Some(found) = object_span.find(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(found.as_str()) {
            if value.is_object() {
                return Ok(value);
            }
        }
    }

    let preview: String = raw.trim().chars().take(120).collect();
    Err(LlmError::ResponseParseError(preview))
}

fn strip_code_fences(raw: &str) -> &str {
    let s = raw.trim();
    for prefix in ["```json", "```"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            if let Some(inner) = rest.strip_suffix("```") {
                return inner.trim();
            }
        }
    }
    s
}

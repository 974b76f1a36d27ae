/// OpenAI API types for activity classification and summary narratives
use focusledger_domain::LedgerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAI API error types
#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    /// No API key configured for this run
    #[error("OpenAI API key is not configured")]
    MissingApiKey,

    /// Network-level error (connection failed, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// OpenAI API returned an error response
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit still exceeded after the HTTP client's retries
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Authentication failed (invalid or revoked API key)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Response body doesn't match expected schema
    #[error("Invalid response schema: {0}")]
    InvalidSchema(String),
}

impl From<OpenAIError> for LedgerError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::MissingApiKey | OpenAIError::Authentication(_) => {
                LedgerError::Config(err.to_string())
            }
            OpenAIError::Network(_) | OpenAIError::RateLimit => LedgerError::Network(err.to_string()),
            OpenAIError::Api { status, .. } if status >= 500 => LedgerError::Network(err.to_string()),
            OpenAIError::Api { .. } | OpenAIError::InvalidSchema(_) => {
                LedgerError::Oracle(err.to_string())
            }
        }
    }
}

/// Classification verdict as produced by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityVerdictPayload {
    /// One of `billable`, `non-billable`, `ambiguous`
    pub classification: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Internal types for OpenAI Chat Completions API
#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub(crate) fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub(crate) fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<JsonSchema>,
}

impl ResponseFormat {
    pub(crate) fn text() -> Self {
        Self { format_type: "text".to_string(), json_schema: None }
    }
}

/// JSON schema wrapper used by OpenAI when `response_format = "json_schema"`.
#[derive(Debug, Serialize)]
pub(crate) struct JsonSchema {
    pub name: String,
    pub schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// Response from OpenAI Chat Completions API
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub total_tokens: i32,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
}

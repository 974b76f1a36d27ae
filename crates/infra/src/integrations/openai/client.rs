/// OpenAI API client for activity classification and summary narratives
use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::NaiveDate;
use focusledger_core::{ClassifierOracle, NarrativeOracle};
use focusledger_domain::utils::format::format_duration;
use focusledger_domain::{
    Classification, LedgerError, OracleConfig, OracleVerdict, Result as DomainResult, SummaryItem,
};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use super::types::{
    ActivityVerdictPayload, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    JsonSchema, OpenAIError, ResponseFormat,
};
use crate::http::HttpClient;

const CLASSIFY_MAX_TOKENS: u32 = 300;
const NARRATIVE_MAX_TOKENS: u32 = 600;
const DEFAULT_TEMPERATURE: f32 = 0.2;
const NARRATIVE_ITEM_LIMIT: usize = 15;

const CLASSIFY_SYSTEM_PROMPT: &str = "You classify desktop activity for a time-tracking product. \
Decide whether time spent in the given application is billable client work, non-billable \
(personal, entertainment, overhead) or ambiguous (could be either).";

const NARRATIVE_SYSTEM_PROMPT: &str = "You write short, factual daily work summaries from \
time-tracking data. Two or three sentences, no bullet points, no invented details.";

/// OpenAI Chat Completions client implementing both oracle ports
pub struct OpenAIClient {
    http_client: HttpClient,
    api_key: String,
    model: String,
    api_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>, http_client: HttpClient) -> Self {
        let defaults = OracleConfig::default();
        Self { http_client, api_key: api_key.into(), model: defaults.model, api_url: defaults.api_url }
    }

    /// Builds a client from configuration. A missing key is reported on the
    /// first call, not here.
    pub fn from_config(config: &OracleConfig) -> DomainResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self::new(config.api_key.clone().unwrap_or_default(), http_client)
            .with_model(config.model.clone())
            .with_api_url(config.api_url.clone()))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Ask the model for a billability verdict on one application.
    pub async fn classify_activity(
        &self,
        app_name: &str,
        app_title: &str,
        context: Option<&str>,
    ) -> Result<OracleVerdict, OpenAIError> {
        let mut prompt = format!("Application: {app_name}\nWindow title: {app_title}\n");
        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            let _ = writeln!(prompt, "Context: {context}");
        }
        prompt.push_str(
            "Return JSON with classification ('billable', 'non-billable' or 'ambiguous'), \
             confidence (0.0-1.0) and reasoning.",
        );

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(CLASSIFY_SYSTEM_PROMPT), ChatMessage::user(prompt)],
            max_tokens: CLASSIFY_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: Some(JsonSchema {
                    name: "activity_classification".to_string(),
                    schema: json!({
                        "type": "object",
                        "properties": {
                            "classification": {
                                "type": "string",
                                "enum": ["billable", "non-billable", "ambiguous"]
                            },
                            "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                            "reasoning": { "type": "string" }
                        },
                        "required": ["classification", "confidence", "reasoning"],
                        "additionalProperties": false
                    }),
                    strict: Some(true),
                }),
            },
        };

        let content = self.call_api(&request).await?.ok_or_else(|| {
            OpenAIError::InvalidSchema("classification response had no content".to_string())
        })?;

        let payload: ActivityVerdictPayload = serde_json::from_str(&content).map_err(|e| {
            OpenAIError::InvalidSchema(format!("failed to parse verdict: {e}. Content: {content}"))
        })?;
        let classification: Classification =
            payload.classification.parse().map_err(OpenAIError::InvalidSchema)?;

        info!(app = app_name, %classification, confidence = payload.confidence, "OpenAI classification complete");

        let verdict = OracleVerdict::new(classification, payload.confidence);
        Ok(match payload.reasoning {
            Some(reasoning) if !reasoning.trim().is_empty() => verdict.with_reasoning(reasoning),
            _ => verdict,
        })
    }

    /// Ask the model for a narrative. Blank answers come back as `None`.
    pub async fn summarize_items(
        &self,
        items: &[SummaryItem],
        subject_name: &str,
        date: NaiveDate,
    ) -> Result<Option<String>, OpenAIError> {
        if items.is_empty() {
            return Ok(None);
        }

        let mut prompt = format!("Summarize the tracked work of {subject_name} on {date}.\n");
        for item in items.iter().take(NARRATIVE_ITEM_LIMIT) {
            let _ = writeln!(
                prompt,
                "- {}: {} total, {} billable, {} interval(s)",
                item.app_name,
                format_duration(item.total_seconds),
                format_duration(item.billable_seconds),
                item.interval_count
            );
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(NARRATIVE_SYSTEM_PROMPT), ChatMessage::user(prompt)],
            max_tokens: NARRATIVE_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            response_format: ResponseFormat::text(),
        };

        let content = self.call_api(&request).await?;
        Ok(content.map(|text| text.trim().to_string()).filter(|text| !text.is_empty()))
    }

    async fn call_api(&self, payload: &ChatCompletionRequest) -> Result<Option<String>, OpenAIError> {
        if self.api_key.trim().is_empty() {
            return Err(OpenAIError::MissingApiKey);
        }

        let request_builder = self
            .http_client
            .request(Method::POST, &self.api_url)
            .bearer_auth(&self.api_key)
            .json(payload);

        let response = self.http_client.send(request_builder).await.map_err(|err| match err {
            LedgerError::Network(msg) | LedgerError::Internal(msg) => OpenAIError::Network(msg),
            other => OpenAIError::Network(format!("HTTP error: {other}")),
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "Received OpenAI API response");

        if !status.is_success() {
            return Err(handle_error_status(status.as_u16(), response).await);
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| OpenAIError::InvalidSchema(format!("failed to parse response: {e}")))?;

        if let Some(usage) = &chat_response.usage {
            debug!(
                tokens = usage.total_tokens,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI token usage"
            );
        }

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::InvalidSchema("response contained no choices".into()))?;
        Ok(choice.message.content)
    }
}

async fn handle_error_status(status: u16, response: reqwest::Response) -> OpenAIError {
    let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        401 | 403 => OpenAIError::Authentication(format!("Invalid API key ({status})")),
        429 => OpenAIError::RateLimit,
        _ => OpenAIError::Api { status, message },
    }
}

#[async_trait]
impl ClassifierOracle for OpenAIClient {
    async fn classify(
        &self,
        app_name: &str,
        app_title: &str,
        context: Option<&str>,
    ) -> DomainResult<OracleVerdict> {
        self.classify_activity(app_name, app_title, context).await.map_err(LedgerError::from)
    }
}

#[async_trait]
impl NarrativeOracle for OpenAIClient {
    async fn summarize(
        &self,
        items: &[SummaryItem],
        subject_name: &str,
        date: NaiveDate,
    ) -> DomainResult<Option<String>> {
        self.summarize_items(items, subject_name, date).await.map_err(LedgerError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_client(api_url: String) -> OpenAIClient {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .max_attempts(1)
            .build()
            .expect("http client");

        OpenAIClient::new("test-api-key", http_client).with_api_url(api_url)
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "content": content } }],
            "usage": { "total_tokens": 120, "prompt_tokens": 100, "completion_tokens": 20 }
        })
    }

    fn items() -> Vec<SummaryItem> {
        vec![SummaryItem {
            app_name: "code".into(),
            total_seconds: 3_600.0,
            billable_seconds: 3_600.0,
            interval_count: 4,
        }]
    }

    #[tokio::test]
    async fn classifies_activity_successfully() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"classification":"billable","confidence":0.92,"reasoning":"IDE"}"#,
            )))
            .mount(&mock_server)
            .await;

        let client = test_client(format!("{}/v1/chat/completions", mock_server.uri()));
        let verdict = client.classify("code", "main.rs - Code", None).await.expect("verdict");

        assert_eq!(verdict.classification, Classification::Billable);
        assert!((verdict.confidence - 0.92).abs() < 1e-9);
        assert_eq!(verdict.reasoning.as_deref(), Some("IDE"));
    }

    #[tokio::test]
    async fn rejected_key_is_a_configuration_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&mock_server)
            .await;

        let client = test_client(mock_server.uri());
        let err = client.classify("code", "Code", None).await.unwrap_err();

        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let http_client = HttpClient::builder().max_attempts(1).build().expect("http client");
        let client = OpenAIClient::new("", http_client).with_api_url(mock_server.uri());

        let err = client.classify("code", "Code", None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[tokio::test]
    async fn unknown_label_is_an_oracle_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"classification":"maybe","confidence":0.5,"reasoning":""}"#,
            )))
            .mount(&mock_server)
            .await;

        let client = test_client(mock_server.uri());
        let err = client.classify("code", "Code", None).await.unwrap_err();

        assert!(matches!(err, LedgerError::Oracle(_)));
    }

    #[tokio::test]
    async fn narrative_text_is_trimmed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("  Alice spent the day in the editor.\n")),
            )
            .mount(&mock_server)
            .await;

        let client = test_client(mock_server.uri());
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let text = client.summarize(&items(), "alice", date).await.expect("narrative");

        assert_eq!(text.as_deref(), Some("Alice spent the day in the editor."));
    }

    #[tokio::test]
    async fn blank_narrative_is_none() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
            .mount(&mock_server)
            .await;

        let client = test_client(mock_server.uri());
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        assert!(client.summarize(&items(), "alice", date).await.expect("narrative").is_none());
        assert!(client.summarize(&[], "alice", date).await.expect("empty").is_none());
    }
}

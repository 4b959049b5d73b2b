//! Gemini API provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use sift_core::{Error, Result};

use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider, Role, StopReason, TokenUsage};

/// Public Gemini endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// LLM provider using Google's Gemini `generateContent` API.
///
/// A provider without an API key can be constructed; every call then fails
/// with `Error::Config`, so the rest of the service keeps working.
pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Gemini API key, if one is configured
    /// * `model` - Model ID (e.g., "gemini-2.0-flash")
    /// * `timeout` - Per-request HTTP timeout
    pub fn new(api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the provider at a different server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(request: &CompletionRequest) -> Value {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({"role": role, "parts": [{"text": m.content}]})
            })
            .collect();

        let mut generation_config = json!({ "maxOutputTokens": request.max_tokens });
        if let Some(temp) = request.temperature {
            generation_config["temperature"] = json!(temp);
        }
        if !request.stop_sequences.is_empty() {
            generation_config["stopSequences"] = json!(request.stop_sequences);
        }
        if let Some(schema) = &request.response_schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if let Some(system) = &request.system_prompt {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        body
    }

    fn parse_response(body: &Value) -> Result<CompletionResponse> {
        let candidate = &body["candidates"][0];
        let content = candidate["content"]["parts"][0]["text"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::parse("Missing content in Gemini response"))?
            .to_string();

        let usage = &body["usageMetadata"];
        let tokens_used = TokenUsage {
            input: usage["promptTokenCount"].as_u64().unwrap_or(0),
            output: usage["candidatesTokenCount"].as_u64().unwrap_or(0),
        };

        let stop_reason = match candidate["finishReason"].as_str() {
            None | Some("STOP") => StopReason::EndTurn,
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some(_) => StopReason::Blocked,
        };

        Ok(CompletionResponse {
            content,
            tokens_used,
            stop_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config(format!("{API_KEY_ENV} not found")))?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(|e| Error::llm_retryable(format!("Failed to call Gemini API: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("Gemini API error {status}: {error_text}");
            return if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Err(Error::llm_retryable(message))
            } else {
                Err(Error::llm(message))
            };
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::parse(format!("Failed to parse Gemini response: {e}")))?;

        Self::parse_response(&body)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.has_api_key())
            .finish()
    }
}

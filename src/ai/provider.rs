//! Model provider abstraction.
//!
//! The gateway talks to an [`AnalysisProvider`]; the default implementation
//! speaks the Gemini `generateContent` JSON API over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::{Config, AI_REQUEST_TIMEOUT_SECS};
use crate::error_handling::{
    categorize_provider_status, categorize_reqwest_error, MissionError, MissionErrorKind,
};

use super::types::{AnalysisRequest, ProviderResponse, TokenUsage};

/// A model API that turns an analysis request into text.
///
/// Errors must already be classified into the mission error taxonomy; the
/// gateway retries only transient kinds.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Issues one call.
    async fn generate(&self, request: &AnalysisRequest) -> Result<ProviderResponse, MissionError>;

    /// Provider name for display
    fn name(&self) -> &str;

    /// Model identifier for display
    fn model(&self) -> &str;
}

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    /// Creates a provider from the library configuration.
    ///
    /// A missing API key is not an error here; every call then fails with
    /// an `api_key` error without touching the network.
    pub fn new(config: &Config) -> Result<Self, MissionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(AI_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MissionError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            base_url: config.ai_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_body(request: &AnalysisRequest) -> serde_json::Value {
        let mut generation_config = json!({
            "responseMimeType": "application/json",
        });
        if let Some(budget) = request.thinking_budget {
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": budget });
        }

        json!({
            "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.user_prompt }] }],
            "generationConfig": generation_config,
        })
    }
}

/// Pulls the human-readable message out of an API error body, falling back
/// to the raw body.
fn error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(300).collect());
    format!("Model API returned HTTP {status}: {detail}")
}

/// Extracts the answer text and usage from a `generateContent` response.
fn parse_response(body: &serde_json::Value) -> Result<ProviderResponse, MissionError> {
    let Some(candidate) = body["candidates"].as_array().and_then(|c| c.first()) else {
        let reason = body["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates returned");
        return Err(MissionError::unknown(format!(
            "Model API returned no answer: {reason}"
        )));
    };

    // Thought summaries are flagged with `thought: true` and are not part of the answer.
    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter(|p| !p["thought"].as_bool().unwrap_or(false))
                .filter_map(|p| p["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate["finishReason"].as_str().unwrap_or("empty answer");
        return Err(MissionError::unknown(format!(
            "Model API returned no text: {reason}"
        )));
    }

    let usage = body.get("usageMetadata").map(|u| TokenUsage {
        prompt_tokens: u["promptTokenCount"].as_u64().unwrap_or(0),
        completion_tokens: u["candidatesTokenCount"].as_u64().unwrap_or(0),
        thinking_tokens: u["thoughtsTokenCount"].as_u64().unwrap_or(0),
    });

    Ok(ProviderResponse { text, usage })
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    async fn generate(&self, request: &AnalysisRequest) -> Result<ProviderResponse, MissionError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(MissionError::new(
                MissionErrorKind::ApiKey,
                format!(
                    "No model API key configured. {}",
                    MissionErrorKind::ApiKey.remediation()
                ),
            ));
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| {
                MissionError::new(
                    categorize_reqwest_error(&e),
                    format!("Model API request failed: {e}"),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let kind = categorize_provider_status(status.as_u16(), &body);
            let mut message = error_message(status.as_u16(), &body);
            if kind == MissionErrorKind::ApiKey {
                message = format!("{message}. {}", kind.remediation());
            }
            log::warn!("{} call failed ({kind}): {message}", self.name());
            return Err(MissionError::new(kind, message));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            MissionError::new(
                categorize_reqwest_error(&e),
                format!("Malformed model API response: {e}"),
            )
        })?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

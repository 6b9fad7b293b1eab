//! Google Gemini provider.
//!
//! Calls `models/{model}:generateContent` on the generative-language API.
//! The key is sent in the `x-goog-api-key` header so it never appears in
//! URLs or transport error messages.

use super::{GenerateRequest, GenerateResponse, Provider, ProviderError, TokenUsage};
use crate::session::{Role, Turn};
use async_trait::async_trait;
use lumen_common::config::GeminiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const PROVIDER_NAME: &str = "gemini";

/// Gemini provider.
pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f64,
    max_output_tokens: i64,
    client: Client,
}

// ══════════════════════════════════════════════════════════════════════════════
// API REQUEST/RESPONSE TYPES
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<i64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<i64>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<i64>,
}

impl GeminiProvider {
    /// Create a provider from configuration.
    ///
    /// A missing API key is reported on the first request, not here, so the
    /// server can still start and serve health checks.
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        let model_name = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/v1beta/{model_name}:generateContent", self.base_url)
    }

    fn error(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::new(PROVIDER_NAME, &self.model, message)
    }

    fn build_body(&self, request: GenerateRequest) -> GenerateContentRequest {
        let system_instruction = request.system.map(|text| Content {
            role: None,
            parts: vec![Part { text }],
        });

        let mut contents: Vec<Content> = request.history.into_iter().map(to_content).collect();
        contents.push(to_content(Turn::user(request.prompt)));

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: request.temperature.unwrap_or(self.temperature),
                max_output_tokens: request.max_output_tokens.unwrap_or(self.max_output_tokens),
            },
        }
    }
}

/// Gemini calls the assistant role `model`.
fn to_content(turn: Turn) -> Content {
    let role = match turn.role {
        Role::User => "user",
        Role::Assistant => "model",
    };
    Content {
        role: Some(role),
        parts: vec![Part { text: turn.text }],
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let start = Instant::now();

        let api_key = self.api_key.as_ref().ok_or_else(|| {
            self.error("Gemini API key not found. Set GEMINI_API_KEY or gemini.api_key in config.")
        })?;

        let turns = request.history.len();
        let body = self.build_body(request);

        tracing::debug!(model = %self.model, turns, "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.error(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(self
                .error(format!("API error ({}): {}", status.as_u16(), error_text))
                .with_status(status.as_u16()));
        }

        let result: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| self.error(format!("Failed to parse response: {}", e)))?;

        if let Some(err) = result.error {
            return Err(self.error(format!("API error: {}", err.message)));
        }

        let Some(candidate) = result.candidates.and_then(|c| c.into_iter().next()) else {
            let message = match result.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => format!("Prompt blocked: {}", reason),
                None => "No response from Gemini".to_string(),
            };
            return Err(self.error(message));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let usage = result
            .usage_metadata
            .map_or(TokenUsage::default(), |u| TokenUsage {
                input_tokens: u.prompt_token_count.unwrap_or(0),
                output_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            });

        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            model = %self.model,
            latency_ms,
            total_tokens = usage.total_tokens,
            "Gemini reply received"
        );

        Ok(GenerateResponse {
            text,
            finish_reason: candidate.finish_reason,
            usage,
            latency_ms,
        })
    }
}

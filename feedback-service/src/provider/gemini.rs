//! Google Gemini provider.
//!
//! Calls `models/{model}:generateContent` and asks for JSON output that
//! follows the request's response schema.

use super::{GenerateRequest, GenerateResponse, GenerationProvider, ProviderError, TokenUsage};
use async_trait::async_trait;
use feedback_common::config::LlmConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const PROVIDER: &str = "gemini";

/// Gemini provider authenticated with an API key.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

// ══════════════════════════════════════════════════════════════════════════════
// API REQUEST/RESPONSE TYPES
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i64>,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
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
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<i64>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<i64>,
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
    #[serde(rename = "supportedGenerationMethods", default)]
    supported_generation_methods: Vec<String>,
}

impl GeminiProvider {
    /// Create a provider from an API key and the LLM settings.
    pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()
            .map_err(|e| {
                ProviderError::new(PROVIDER, &config.model, format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    fn error(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::new(PROVIDER, &self.model, message)
    }

    /// List models that support `generateContent`.
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/models", self.base_url))
                .query(&[("key", self.api_key.as_str())]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
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

            let page: ListModelsResponse = response
                .json()
                .await
                .map_err(|e| self.error(format!("Failed to parse model list: {}", e)))?;

            names.extend(
                page.models
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
                    .map(|m| m.name),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let start = Instant::now();

        let response_mime_type = request
            .response_schema
            .as_ref()
            .map(|_| "application/json".to_string());

        let gemini_request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type,
                response_schema: request.response_schema,
            },
        };

        let url = format!("{}/{}:generateContent", self.base_url, self.model_path());

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.error(format!("Request timed out: {}", e))
                } else {
                    self.error(format!("Request failed: {}", e))
                }
            })?;

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

        let candidate = result.candidates.and_then(|c| c.into_iter().next());
        let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());

        // Missing candidates or parts are an empty result, not an error
        let content = candidate
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = result.usage_metadata.map_or(TokenUsage::default(), |u| TokenUsage {
            input_tokens: u.prompt_token_count.unwrap_or(0),
            output_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count.unwrap_or(0),
        });

        Ok(GenerateResponse {
            provider: PROVIDER.into(),
            model: self.model.clone(),
            content,
            usage,
            finish_reason,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            base_url: "http://localhost:1/v1beta/".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn provider_name_is_gemini() {
        let provider = GeminiProvider::new("key", &config("gemini-flash-latest")).unwrap();
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.model(), "gemini-flash-latest");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = GeminiProvider::new("key", &config("gemini-flash-latest")).unwrap();
        assert_eq!(provider.base_url, "http://localhost:1/v1beta");
    }

    #[test]
    fn model_path_prefixed_once() {
        let plain = GeminiProvider::new("key", &config("gemini-2.0-flash")).unwrap();
        assert_eq!(plain.model_path(), "models/gemini-2.0-flash");

        let prefixed = GeminiProvider::new("key", &config("models/gemini-2.0-flash")).unwrap();
        assert_eq!(prefixed.model_path(), "models/gemini-2.0-flash");
    }

    #[test]
    fn request_serializes_structured_output() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part { text: "hi".into() }],
            }],
            generation_config: GenerationConfig {
                temperature: Some(0.5),
                max_output_tokens: None,
                response_mime_type: Some("application/json".into()),
                response_schema: Some(serde_json::json!({"type": "OBJECT"})),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}

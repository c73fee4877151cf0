//! Text generation providers.
//!
//! Providers implement [`GenerationProvider`]: send a prompt with a requested
//! output schema and get back the generated text.

mod gemini;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Provider Trait
// ============================================================================

/// Interface to an external text generation service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the model this provider sends requests to.
    fn model(&self) -> &str;

    /// Generate content for a single prompt.
    ///
    /// An `Ok` response with empty `content` means the service answered
    /// but produced nothing usable.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError>;
}

/// Error from a provider.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: String,
    pub model: String,
    pub message: String,
    pub status_code: Option<u16>,
}

impl ProviderError {
    pub fn new(provider: &str, model: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.provider, self.model, self.message)
    }
}

impl std::error::Error for ProviderError {}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A single-prompt generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Full prompt text
    pub prompt: String,
    /// JSON schema the output must follow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    /// Temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i64>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: i64) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// Generation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Provider name
    pub provider: String,
    /// Model used
    pub model: String,
    /// Generated text (JSON when a schema was requested)
    pub content: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Finish reason
    pub finish_reason: Option<String>,
    /// Response latency in milliseconds
    pub latency_ms: u64,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new("gemini", "gemini-flash-latest", "boom").with_status(503);
        assert_eq!(err.to_string(), "[gemini:gemini-flash-latest] boom");
        assert_eq!(err.status_code, Some(503));
    }

    #[test]
    fn test_generate_request_builder() {
        let request = GenerateRequest::new("hello")
            .with_schema(serde_json::json!({"type": "OBJECT"}))
            .with_temperature(0.2)
            .with_max_output_tokens(256);

        assert_eq!(request.prompt, "hello");
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.max_output_tokens, Some(256));
        assert!(request.response_schema.is_some());
    }
}

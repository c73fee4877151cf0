//! Review analysis.
//!
//! Turns a review and its star rating into a summary, a suggested business
//! action and a customer reply. Generation goes through a
//! [`GenerationProvider`]; every failure mode resolves to rating-based
//! fallback text so `analyze` always returns a complete [`Analysis`].

use crate::provider::{GenerateRequest, GenerationProvider, GeminiProvider, ProviderError};
use feedback_common::config::{Config, LlmConfig};
use serde::Deserialize;
use std::sync::Arc;

/// Number of review characters quoted in a failure summary.
const EXCERPT_CHARS: usize = 30;

/// Generated (or fallback) analysis of one review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub summary: String,
    pub action: String,
    pub reply: String,
}

/// Rating bucket driving tone, intent and fallback wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn from_rating(rating: i64) -> Self {
        match rating {
            r if r <= 2 => Self::Negative,
            3 => Self::Neutral,
            _ => Self::Positive,
        }
    }

    pub fn tone(self) -> &'static str {
        match self {
            Self::Negative => "apologetic and empathetic",
            Self::Neutral => "neutral and professional",
            Self::Positive => "positive and enthusiastic",
        }
    }

    pub fn intent(self) -> &'static str {
        match self {
            Self::Negative => {
                "Acknowledge the specific problem, apologize sincerely, and reassure the customer that it will be addressed."
            }
            Self::Neutral => {
                "Thank the customer, acknowledge both what worked and what fell short, and invite further feedback."
            }
            Self::Positive => {
                "Express genuine gratitude, reference what the customer enjoyed, and invite them back."
            }
        }
    }
}

fn stars(rating: i64) -> String {
    if rating == 1 {
        "1 star".to_string()
    } else {
        format!("{} stars", rating)
    }
}

/// Canned analysis used when no generation is attempted or it yields nothing.
pub fn fallback_analysis(rating: i64) -> Analysis {
    match Sentiment::from_rating(rating) {
        Sentiment::Negative => Analysis {
            summary: format!("Customer expressed dissatisfaction in a {}-star review.", rating),
            action: "Contact the customer within 24 hours to investigate the issue and offer a resolution."
                .to_string(),
            reply: format!(
                "We're sorry your experience only earned {}. We take this seriously and will work to make it right.",
                stars(rating)
            ),
        },
        Sentiment::Neutral => Analysis {
            summary: format!("Customer shared neutral feedback in a {}-star review.", rating),
            action: format!(
                "Follow up with the customer to learn what would lift their experience above {}.",
                stars(rating)
            ),
            reply: format!(
                "Thank you for your {}-star review. We appreciate the honest feedback and will use it to improve.",
                rating
            ),
        },
        Sentiment::Positive => Analysis {
            summary: format!("Customer shared positive feedback in a {}-star review.", rating),
            action: format!(
                "Thank the customer and share this {}-star feedback with the team.",
                rating
            ),
            reply: format!(
                "Thank you so much for the {}-star review! We're thrilled you enjoyed your experience.",
                rating
            ),
        },
    }
}

/// First [`EXCERPT_CHARS`] characters of the trimmed review.
fn excerpt(review: &str) -> String {
    let trimmed = review.trim();
    let mut out: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    if trimmed.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

/// Analysis returned after a failed generation attempt.
///
/// Action and reply match [`fallback_analysis`]; the summary quotes the
/// review so failed calls are distinguishable from the unconfigured path.
pub fn failure_analysis(review: &str, rating: i64) -> Analysis {
    let fallback = fallback_analysis(rating);
    let quoted = excerpt(review);

    let summary = match Sentiment::from_rating(rating) {
        Sentiment::Negative => format!(
            "Customer reported a negative experience ({}/5): \"{}\"",
            rating, quoted
        ),
        Sentiment::Neutral => format!("Customer left mixed feedback ({}/5): \"{}\"", rating, quoted),
        Sentiment::Positive => format!(
            "Customer praised their experience ({}/5): \"{}\"",
            rating, quoted
        ),
    };

    Analysis { summary, ..fallback }
}

/// Build the generation prompt for a review.
pub fn build_prompt(review: &str, rating: i64) -> String {
    let sentiment = Sentiment::from_rating(rating);

    format!(
        r#"You are a customer experience analyst reviewing feedback left for a business.

Customer rating: {rating}/5
Customer review: "{review}"

Reply tone: {tone}
Reply intent: {intent}

Return a JSON object with exactly these fields:
- summary: one sentence capturing the customer's sentiment and the specific detail behind it. Do not be generic.
- action: one concrete next step the business should take in response to this review.
- reply: a short reply to the customer (two or three sentences) in the requested tone that refers to what they actually wrote."#,
        rating = rating,
        review = review,
        tone = sentiment.tone(),
        intent = sentiment.intent(),
    )
}

/// Output schema requested from the provider.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "action": { "type": "STRING" },
            "reply": { "type": "STRING" }
        },
        "required": ["summary", "action", "reply"],
        "propertyOrdering": ["summary", "action", "reply"]
    })
}

/// Decoded provider output. Any field may be missing.
#[derive(Debug, Deserialize)]
struct GeneratedFields {
    summary: Option<String>,
    action: Option<String>,
    reply: Option<String>,
}

/// Why a generation attempt was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("generation failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("malformed generation output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("generation output is not a JSON object")]
    NotObject,
}

/// Outcome of a generation attempt that did not fail.
enum Generated {
    Empty,
    Fields(GeneratedFields),
}

/// Review analyzer backed by an optional generation provider.
#[derive(Clone)]
pub struct ReviewAnalyzer {
    provider: Option<Arc<dyn GenerationProvider>>,
    temperature: f64,
    max_output_tokens: i64,
}

impl ReviewAnalyzer {
    /// Create an analyzer. `None` runs in degraded mode.
    pub fn new(provider: Option<Arc<dyn GenerationProvider>>, llm: &LlmConfig) -> Self {
        Self {
            provider,
            temperature: llm.temperature,
            max_output_tokens: llm.max_output_tokens,
        }
    }

    /// Create an analyzer that never calls out.
    pub fn disabled() -> Self {
        Self::new(None, &LlmConfig::default())
    }

    /// Build from configuration, wiring Gemini when a credential is present.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider: Option<Arc<dyn GenerationProvider>> = match config.llm_api_key() {
            Some(key) => {
                let gemini = GeminiProvider::new(key, &config.llm)
                    .map_err(|e| anyhow::anyhow!("{}", e))?;
                Some(Arc::new(gemini) as Arc<dyn GenerationProvider>)
            }
            None => {
                tracing::warn!("GEMINI_API_KEY missing, review analysis runs on fallback text");
                None
            }
        };

        Ok(Self::new(provider, &config.llm))
    }

    /// Whether a generation provider is configured.
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Model name of the configured provider.
    pub fn model(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model())
    }

    /// Analyze a review. Never fails.
    pub async fn analyze(&self, review: &str, rating: i64) -> Analysis {
        let fallback = fallback_analysis(rating);

        let Some(provider) = self.provider.as_deref() else {
            tracing::debug!(rating, "No generation provider configured, using fallback analysis");
            return fallback;
        };

        match self.generate(provider, review, rating).await {
            Ok(Generated::Empty) => {
                tracing::warn!(
                    provider = provider.name(),
                    rating,
                    "Empty generation result, using fallback analysis"
                );
                fallback
            }
            Ok(Generated::Fields(fields)) => Analysis {
                summary: pick(fields.summary, fallback.summary),
                action: pick(fields.action, fallback.action),
                reply: pick(fields.reply, fallback.reply),
            },
            Err(e) => {
                tracing::warn!(
                    provider = provider.name(),
                    rating,
                    error = %e,
                    "Review analysis failed, using failure fallback"
                );
                failure_analysis(review, rating)
            }
        }
    }

    async fn generate(
        &self,
        provider: &dyn GenerationProvider,
        review: &str,
        rating: i64,
    ) -> Result<Generated, AnalysisError> {
        let request = GenerateRequest::new(build_prompt(review, rating))
            .with_schema(response_schema())
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens);

        let response = provider.generate(request).await?;

        tracing::info!(
            provider = %response.provider,
            model = %response.model,
            latency_ms = response.latency_ms,
            output_tokens = response.usage.output_tokens,
            "Review analysis generated"
        );

        if response.content.trim().is_empty() {
            return Ok(Generated::Empty);
        }

        // Structs also deserialize from arrays by position, so check the shape first
        let value: serde_json::Value = serde_json::from_str(response.content.trim())?;
        if !value.is_object() {
            return Err(AnalysisError::NotObject);
        }

        let fields: GeneratedFields = serde_json::from_value(value)?;
        Ok(Generated::Fields(fields))
    }
}

/// Use the generated value unless it is missing or blank.
fn pick(generated: Option<String>, fallback: String) -> String {
    match generated {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => fallback,
    }
}

//! Review records and the request/response shapes built from them.

use feedback_common::{Validate, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// Lowest accepted star rating.
pub const MIN_RATING: i64 = 1;

/// Highest accepted star rating.
pub const MAX_RATING: i64 = 5;

/// Maximum review length in characters.
pub const MAX_REVIEW_CHARS: usize = 2000;

/// A persisted review with its generated analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub rating: i64,
    pub review: String,
    pub ai_summary: String,
    pub ai_action: String,
    pub ai_response: String,
}

/// Body of `POST /submit-review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub rating: i64,
    pub review: String,
}

impl Validate for ReviewInput {
    /// Check the schema bounds on rating and review length.
    ///
    /// Length is counted in characters, not bytes. A whitespace-only review
    /// passes here; the submit handler rejects it separately.
    fn validate(&self) -> ValidationResult<()> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ValidationError::InvalidValue {
                field: "rating".into(),
                reason: format!(
                    "must be between {} and {}, got {}",
                    MIN_RATING, MAX_RATING, self.rating
                ),
            });
        }

        let chars = self.review.chars().count();
        if chars == 0 {
            return Err(ValidationError::MissingField {
                field: "review".into(),
            });
        }
        if chars > MAX_REVIEW_CHARS {
            return Err(ValidationError::InvalidValue {
                field: "review".into(),
                reason: format!("must be at most {} characters, got {}", MAX_REVIEW_CHARS, chars),
            });
        }

        Ok(())
    }
}

/// Response to a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutput {
    pub message: String,
    pub ai_response: String,
}

/// Admin view of a review. The generated reply is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminReview {
    pub rating: i64,
    pub review: String,
    pub ai_summary: String,
    pub ai_action: String,
}

impl From<Review> for AdminReview {
    fn from(review: Review) -> Self {
        Self {
            rating: review.rating,
            review: review.review,
            ai_summary: review.ai_summary,
            ai_action: review.ai_action,
        }
    }
}

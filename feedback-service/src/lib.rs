//! feedback-service - Customer review intake with generated summaries, actions and replies.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod analyzer;
pub mod auth;
pub mod error;
pub mod extract;
pub mod models;
pub mod provider;
pub mod routes;
pub mod store;

pub use analyzer::{fallback_analysis, failure_analysis, Analysis, ReviewAnalyzer, Sentiment};
pub use auth::AdminAuth;
pub use error::ApiError;
pub use models::{AdminReview, Review, ReviewInput, ReviewOutput};
pub use provider::{GeminiProvider, GenerateRequest, GenerateResponse, GenerationProvider, ProviderError};
pub use routes::{build_router, AppState};
pub use store::{ReviewStore, StoreSession};

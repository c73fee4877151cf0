//! HTTP API routes.

use crate::analyzer::{Analysis, ReviewAnalyzer};
use crate::auth::{admin_middleware, AdminAuth};
use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::models::{AdminReview, ReviewInput, ReviewOutput};
use crate::store::ReviewStore;
use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use feedback_common::config::Config;
use feedback_common::logging::generate_trace_id;
use std::sync::Arc;
use tracing::Instrument;

/// Confirmation returned with every accepted review.
pub const SUBMIT_MESSAGE: &str = "Review submitted successfully";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<ReviewAnalyzer>,
    pub store: ReviewStore,
    pub admin: AdminAuth,
}

impl AppState {
    /// State with open admin routes.
    pub fn new(analyzer: ReviewAnalyzer, store: ReviewStore) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            store,
            admin: AdminAuth::open(),
        }
    }

    pub fn with_admin(mut self, admin: AdminAuth) -> Self {
        self.admin = admin;
        self
    }

    /// Wire analyzer, store and admin guard from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let analyzer = ReviewAnalyzer::from_config(config)?;
        let store = ReviewStore::new(config.database.sqlite_path())?;
        let admin = AdminAuth::from_option(config.admin.token.as_deref());

        if !admin.is_enforced() {
            tracing::warn!("No admin token configured, /admin/reviews is unauthenticated");
        }

        Ok(Self::new(analyzer, store).with_admin(admin))
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin/reviews", get(admin_reviews))
        .route_layer(middleware::from_fn_with_state(
            state.admin.clone(),
            admin_middleware,
        ));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Reviews
        .route("/submit-review", post(submit_review))
        .merge(admin_routes)
        // Diagnostics
        .route("/debug/config", get(debug_config))
        .with_state(state)
}

// ============ Health Check ============

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "feedback-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============ Reviews ============

async fn submit_review(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<ReviewInput>,
) -> Result<Json<ReviewOutput>, ApiError> {
    if input.review.trim().is_empty() {
        return Err(ApiError::BadRequest("Empty review".to_string()));
    }

    let trace_id = generate_trace_id();
    let span = feedback_common::request_span!("submit_review", trace_id, rating = input.rating);

    async move {
        let ReviewInput { rating, review } = input;

        // Analysis always completes before anything is written
        let Analysis {
            summary,
            action,
            reply,
        } = state.analyzer.analyze(&review, rating).await;

        let stored = state
            .store
            .with_session(move |session| session.create(rating, &review, &summary, &action, &reply))
            .await?;

        tracing::info!(review_id = stored.id, "Review stored");

        Ok(Json(ReviewOutput {
            message: SUBMIT_MESSAGE.to_string(),
            ai_response: stored.ai_response,
        }))
    }
    .instrument(span)
    .await
}

async fn admin_reviews(State(state): State<AppState>) -> Result<Json<Vec<AdminReview>>, ApiError> {
    let reviews = state.store.with_session(|session| session.list_all()).await?;

    tracing::debug!(count = reviews.len(), "Listed reviews");

    Ok(Json(reviews.into_iter().map(AdminReview::from).collect()))
}

// ============ Diagnostics ============

async fn debug_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "llm_loaded": true,
        "env_loaded": state.analyzer.is_enabled(),
        "model": state.analyzer.model(),
        "admin_protected": state.admin.is_enforced()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let store = ReviewStore::new(dir.path().join("reviews.db")).unwrap();
        let app = build_router(AppState::new(ReviewAnalyzer::disabled(), store));
        (dir, app)
    }

    fn submit(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/submit-review")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_review() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(submit(r#"{"rating": 5, "review": "This is a great test review."}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_whitespace_review_is_bad_request() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(submit(r#"{"rating": 4, "review": "   "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_unprocessable() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(submit(r#"{"rating": 6, "review": "ok"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_debug_config_without_key() {
        let (_dir, app) = test_app();

        let response = app
            .oneshot(Request::builder().uri("/debug/config").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["env_loaded"], false);
        assert!(json["model"].is_null());
    }
}

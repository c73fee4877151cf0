//! Optional bearer-token guard for admin routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;

/// Admin access settings shared across requests.
#[derive(Clone, Default)]
pub struct AdminAuth {
    token: Option<Arc<String>>,
}

impl AdminAuth {
    /// Require `Authorization: Bearer <token>` on admin routes.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(Arc::new(token.into())),
        }
    }

    /// Leave admin routes open.
    pub fn open() -> Self {
        Self::default()
    }

    /// Build from an optional configured token. Blank tokens count as unset.
    pub fn from_option(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some(t) if !t.is_empty() => Self::with_token(t),
            _ => Self::open(),
        }
    }

    pub fn is_enforced(&self) -> bool {
        self.token.is_some()
    }

    /// Check a raw `Authorization` header value.
    pub fn authorize(&self, header_value: Option<&str>) -> bool {
        let Some(expected) = self.token.as_deref() else {
            return true;
        };

        match header_value.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(presented) => constant_time_eq(presented.trim().as_bytes(), expected.as_bytes()),
            None => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Admin middleware.
pub async fn admin_middleware(
    State(auth): State<AdminAuth>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if !auth.authorize(header_value) {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_allows_everything() {
        let auth = AdminAuth::open();
        assert!(!auth.is_enforced());
        assert!(auth.authorize(None));
        assert!(auth.authorize(Some("Bearer anything")));
    }

    #[test]
    fn test_token_required() {
        let auth = AdminAuth::with_token("s3cret");
        assert!(auth.is_enforced());
        assert!(auth.authorize(Some("Bearer s3cret")));
        assert!(!auth.authorize(Some("Bearer wrong")));
        assert!(!auth.authorize(Some("s3cret")));
        assert!(!auth.authorize(None));
    }

    #[test]
    fn test_blank_token_is_open() {
        assert!(!AdminAuth::from_option(Some("  ")).is_enforced());
        assert!(!AdminAuth::from_option(None).is_enforced());
        assert!(AdminAuth::from_option(Some("abc")).is_enforced());
    }
}

//! Bearer-token guard for the admin API.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

/// The configured admin token. `None` rejects every admin request.
#[derive(Debug, Clone, Default)]
pub struct AdminToken(Option<Arc<str>>);

impl AdminToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.map(Arc::from))
    }

    fn accepts(&self, provided: &str) -> bool {
        match self.0.as_deref() {
            Some(expected) => constant_time_eq(expected.as_bytes(), provided.as_bytes()),
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

/// Middleware that lets a request through only with `Authorization: Bearer <token>`.
pub async fn require_admin(
    State(token): State<AdminToken>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let has_credentials = provided.is_some();
    if provided.is_some_and(|p| token.accepts(p)) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        path = %request.uri().path(),
        has_credentials,
        "admin request rejected"
    );
    Err(ApiError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_token_accepts_nothing() {
        let token = AdminToken::new(None);
        assert!(!token.accepts(""));
        assert!(!token.accepts("anything"));
    }

    #[test]
    fn test_token_must_match_exactly() {
        let token = AdminToken::new(Some("s3cret".to_string()));
        assert!(token.accepts("s3cret"));
        assert!(!token.accepts("s3cre"));
        assert!(!token.accepts("S3CRET"));
    }
}

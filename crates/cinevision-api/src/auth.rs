//! Admin authentication
//!
//! The upload/admin surface is protected by a single service API key carried
//! as `Authorization: Bearer <key>`. Comparison is constant-time.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use cinevision_core::AppError;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AuthState {
    pub service_api_key: String,
}

pub async fn require_service_key(
    State(auth): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected Bearer token".to_string()))?;

    let matches: bool = token
        .as_bytes()
        .ct_eq(auth.service_api_key.as_bytes())
        .into();
    if !matches {
        return Err(HttpAppError(AppError::Unauthorized(
            "Invalid service API key".to_string(),
        )));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        let auth = Arc::new(AuthState {
            service_api_key: "sk-test-0123456789abcdef".to_string(),
        });
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(auth, require_service_key))
    }

    async fn status_for(auth_header: Option<&str>) -> StatusCode {
        let mut builder = axum::http::Request::builder().uri("/admin");
        if let Some(value) = auth_header {
            builder = builder.header("Authorization", value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_valid_key_passes() {
        assert_eq!(
            status_for(Some("Bearer sk-test-0123456789abcdef")).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        assert_eq!(
            status_for(Some("Bearer sk-wrong")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_rejected() {
        assert_eq!(
            status_for(Some("Basic sk-test-0123456789abcdef")).await,
            StatusCode::UNAUTHORIZED
        );
    }
}

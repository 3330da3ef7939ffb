//! HTTP mapping for the credential error taxonomy.
//!
//! This is the single collapse point: whatever the internal cause, the wire
//! shape for credential failures is the same, and internal failures are
//! logged in full server-side while the caller gets an opaque body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::auth::AuthError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: String,
}

impl ErrorBody {
    fn new(error: &str, description: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            error_description: description.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("invalid_request", message),
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("invalid_token", "Invalid or expired credential"),
            ),
            AuthError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody::new("rate_limited", "Too many requests"),
            ),
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("unauthenticated", "Authentication required"),
            ),
            AuthError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody::new("not_found", "Not found"),
            ),
            AuthError::Internal(err) => {
                error!("request failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("server_error", "Internal error"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::body::to_bytes;

    async fn body_of(error: AuthError) -> anyhow::Result<(StatusCode, ErrorBody)> {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn statuses_follow_the_taxonomy() -> anyhow::Result<()> {
        let (status, body) = body_of(AuthError::Validation("bad email".to_string())).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "invalid_request");
        assert_eq!(body.error_description, "bad email");

        let (status, body) = body_of(AuthError::InvalidToken).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.error, "invalid_token");

        let (status, _body) = body_of(AuthError::RateLimited).await?;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let (status, _body) = body_of(AuthError::Unauthenticated).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _body) = body_of(AuthError::NotFound).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn internal_detail_never_reaches_the_caller() -> anyhow::Result<()> {
        let (status, body) =
            body_of(AuthError::Internal(anyhow!("pg password was hunter2"))).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_description, "Internal error");
        assert!(!format!("{body:?}").contains("hunter2"));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_token_body_is_cause_agnostic() -> anyhow::Result<()> {
        // Expired, consumed, and unknown credentials all produce this body.
        let (_status, body) = body_of(AuthError::InvalidToken).await?;
        assert_eq!(body.error_description, "Invalid or expired credential");
        Ok(())
    }
}

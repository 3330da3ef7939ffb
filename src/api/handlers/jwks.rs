//! Public key discovery document.

use axum::extract::Extension;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use std::sync::Arc;
use tracing::error;

use crate::auth::AuthState;

#[utoipa::path(
    get,
    path = "/.well-known/jwks.json",
    responses(
        (status = 200, description = "JWKS public keys", body = String, content_type = "application/json")
    ),
    tag = "jwt"
)]
pub async fn jwks(state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    // Short max-age keeps rotation visible to caching verifiers quickly.
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=300"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    match state.token_issuer().jwks().to_json_pretty() {
        Ok(jwks_json) => (StatusCode::OK, headers, jwks_json),
        Err(e) => {
            error!("Failed to render JWKS: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, headers, "{}".to_string())
        }
    }
}

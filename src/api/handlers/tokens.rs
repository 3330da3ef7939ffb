//! Session-authenticated AHP token management.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{tokens, AuthError, AuthState};
use crate::store::AhpTokenRecord;

use super::session::authenticate_session;

/// Token metadata as exposed over the API. The secret hash never leaves the
/// store; only the masked display hint does.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenMetadata {
    pub id: String,
    pub name: String,
    pub scopes: Vec<String>,
    pub token_display: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl From<AhpTokenRecord> for TokenMetadata {
    fn from(record: AhpTokenRecord) -> Self {
        Self {
            id: record.token_id,
            name: record.name,
            scopes: record.scopes,
            token_display: record.display_hint,
            created_at: record.created_at,
            expires_at: record.expires_at,
            last_used_at: record.last_used_at,
            active: record.active,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateTokenRequest {
    pub name: String,
    pub scopes: Vec<String>,
    pub expires_days: Option<i64>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateTokenResponse {
    /// The plaintext secret. Shown exactly once; never retrievable again.
    pub token: String,
    pub token_info: TokenMetadata,
}

#[utoipa::path(
    get,
    path = "/api/tokens",
    responses(
        (status = 200, description = "Active tokens, newest first", body = [TokenMetadata]),
        (status = 401, description = "No valid session", body = crate::api::error::ErrorBody)
    ),
    tag = "tokens"
)]
pub async fn list_tokens(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
) -> Result<Json<Vec<TokenMetadata>>, AuthError> {
    let user = authenticate_session(&headers, &state).await?;
    let listed = tokens::list_tokens(&state, &user.email).await?;
    Ok(Json(listed.into_iter().map(TokenMetadata::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/tokens",
    request_body = CreateTokenRequest,
    responses(
        (status = 201, description = "Token created; the secret appears only here", body = CreateTokenResponse),
        (status = 400, description = "Bad name or scopes", body = crate::api::error::ErrorBody),
        (status = 401, description = "No valid session", body = crate::api::error::ErrorBody)
    ),
    tag = "tokens"
)]
pub async fn create_token(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Result<Json<CreateTokenRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let user = authenticate_session(&headers, &state).await?;
    let Json(request) = payload
        .map_err(|_| AuthError::Validation("missing or malformed payload".to_string()))?;

    let created = tokens::create_token(
        &state,
        &user.email,
        &request.name,
        &request.scopes,
        request.expires_days,
    )
    .await?;

    let response = CreateTokenResponse {
        token: created.secret,
        token_info: TokenMetadata::from(created.record),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/tokens/{id}",
    params(
        ("id" = String, Path, description = "Token identifier")
    ),
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "No valid session", body = crate::api::error::ErrorBody),
        (status = 404, description = "Unknown token", body = crate::api::error::ErrorBody)
    ),
    tag = "tokens"
)]
pub async fn revoke_token(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    Path(token_id): Path<String>,
) -> Result<StatusCode, AuthError> {
    let user = authenticate_session(&headers, &state).await?;
    tokens::revoke_token(&state, &user.email, &token_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

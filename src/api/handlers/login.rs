//! Login form endpoints: transaction-id minting and submission.

use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::magic_link::{self, LoginRequest};
use crate::auth::{extract_client_ip, AuthError, AuthState};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginFormResponse {
    /// Single-use id the rendered form must echo back on submission.
    pub transaction_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginSubmission {
    pub email: String,
    pub transaction_id: String,
    /// Decoy field. Humans never see it; a non-empty value marks a bot.
    #[serde(default)]
    pub honeypot: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginAccepted {
    pub status: String,
}

/// Mint a transaction id for the page-rendering collaborator.
#[utoipa::path(
    get,
    path = "/login/form",
    responses(
        (status = 200, description = "Fresh form transaction id", body = LoginFormResponse)
    ),
    tag = "auth"
)]
pub async fn login_form(
    state: Extension<Arc<AuthState>>,
) -> Result<Json<LoginFormResponse>, AuthError> {
    let transaction_id = state.guard().issue().map_err(AuthError::Internal)?;
    Ok(Json(LoginFormResponse { transaction_id }))
}

/// Accept a login-form submission and dispatch the magic link.
///
/// The response shape is identical whether or not the account already
/// existed.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginSubmission,
    responses(
        (status = 200, description = "Login email queued (or silently dropped)", body = LoginAccepted),
        (status = 400, description = "Malformed submission", body = crate::api::error::ErrorBody),
        (status = 429, description = "Rate limited", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    payload: Result<Json<LoginSubmission>, JsonRejection>,
) -> Result<Json<LoginAccepted>, AuthError> {
    let Json(submission) = payload
        .map_err(|_| AuthError::Validation("missing or malformed payload".to_string()))?;
    let client_ip = extract_client_ip(&headers);
    magic_link::request_login(
        &state,
        client_ip.as_deref(),
        &LoginRequest {
            email: submission.email,
            transaction_id: submission.transaction_id,
            honeypot: submission.honeypot,
        },
    )
    .await?;
    Ok(Json(LoginAccepted {
        status: "ok".to_string(),
    }))
}

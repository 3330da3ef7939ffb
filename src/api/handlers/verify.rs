//! Magic-link verification endpoint (`GET|POST /token`).

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Query};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::auth::{magic_link, AuthError, AuthState};

use super::session::{session_cookie, SessionInfo};

#[derive(ToSchema, IntoParams, Serialize, Deserialize, Debug)]
#[into_params(parameter_in = Query)]
pub struct VerifyParams {
    pub email: String,
    pub mail_token: String,
}

/// Verify a token arriving from an email link click.
#[utoipa::path(
    get,
    path = "/token",
    params(VerifyParams),
    responses(
        (status = 200, description = "Session started", body = SessionInfo),
        (status = 401, description = "Invalid token", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_get(
    state: Extension<Arc<AuthState>>,
    query: Result<Query<VerifyParams>, QueryRejection>,
) -> Result<Response, AuthError> {
    let Query(params) = query
        .map_err(|_| AuthError::Validation("missing email or mail_token".to_string()))?;
    verify(&state, &params).await
}

/// Verify a token submitted manually.
#[utoipa::path(
    post,
    path = "/token",
    request_body = VerifyParams,
    responses(
        (status = 200, description = "Session started", body = SessionInfo),
        (status = 401, description = "Invalid token", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_post(
    state: Extension<Arc<AuthState>>,
    payload: Result<Json<VerifyParams>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(params) = payload
        .map_err(|_| AuthError::Validation("missing or malformed payload".to_string()))?;
    verify(&state, &params).await
}

async fn verify(state: &AuthState, params: &VerifyParams) -> Result<Response, AuthError> {
    let started = magic_link::verify_login(state, &params.email, &params.mail_token).await?;

    let cookie = session_cookie(state.config(), &started.session_id)
        .map_err(|err| AuthError::Internal(err.into()))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    Ok((StatusCode::OK, headers, Json(SessionInfo::from(started.user))).into_response())
}

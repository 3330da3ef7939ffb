//! AHP-token-to-JWT exchange endpoint (`POST /auth`).

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Query};
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::auth::exchange::{self, parse_scope_param};
use crate::auth::{extract_client_ip, AuthError, AuthState};

#[derive(ToSchema, IntoParams, Serialize, Deserialize, Debug)]
#[into_params(parameter_in = Query)]
pub struct ExchangeRequest {
    /// The AHP token secret.
    pub token: String,
    /// Optional space-delimited subset of the granted scopes.
    pub scope: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ExchangeResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

#[utoipa::path(
    post,
    path = "/auth",
    params(ExchangeRequest),
    request_body = ExchangeRequest,
    responses(
        (status = 200, description = "Short-lived bearer token", body = ExchangeResponse),
        (status = 401, description = "Invalid token", body = crate::api::error::ErrorBody),
        (status = 429, description = "Rate limited", body = crate::api::error::ErrorBody)
    ),
    tag = "jwt"
)]
pub async fn exchange(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
    query: Result<Query<ExchangeRequest>, QueryRejection>,
    payload: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    // The body wins when both are present; machine clients mostly POST JSON
    // while shell one-liners lean on query parameters.
    let request = match payload {
        Ok(Json(request)) => request,
        Err(_) => match query {
            Ok(Query(request)) => request,
            Err(_) => {
                return Err(AuthError::Validation(
                    "missing token parameter".to_string(),
                ))
            }
        },
    };

    let client_ip = extract_client_ip(&headers);
    let requested = parse_scope_param(request.scope.as_deref());
    let grant = exchange::exchange(
        &state,
        client_ip.as_deref(),
        &request.token,
        requested.as_deref(),
        Utc::now(),
    )
    .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    let body = ExchangeResponse {
        access_token: grant.access_token,
        token_type: "Bearer".to_string(),
        expires_in: grant.expires_in,
        scope: grant.scope,
    };
    Ok((StatusCode::OK, response_headers, Json(body)).into_response())
}

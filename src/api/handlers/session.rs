//! Session cookie plumbing and session endpoints.

use axum::extract::Extension;
use axum::http::header::{InvalidHeaderValue, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::state::AuthConfig;
use crate::auth::{session, AuthError, AuthState};
use crate::store::UserRecord;

const SESSION_COOKIE_NAME: &str = "sigillo_session";

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionInfo {
    pub email: String,
    pub name: String,
}

impl From<UserRecord> for SessionInfo {
    fn from(user: UserRecord) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

/// Build a secure `HttpOnly` cookie carrying the session id.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the session id out of the cookie header, if present. Bearer tokens
/// are deliberately not accepted here: sessions and API credentials are
/// separate classes.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

/// Resolve the session cookie to its user or fail `Unauthenticated`.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<UserRecord, AuthError> {
    let Some(token) = extract_session_token(headers) else {
        return Err(AuthError::Unauthenticated);
    };
    session::validate(state, &token).await
}

#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Session is active", body = SessionInfo),
        (status = 401, description = "No valid session", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn session_info(
    headers: HeaderMap,
    state: Extension<Arc<AuthState>>,
) -> Result<Json<SessionInfo>, AuthError> {
    let user = authenticate_session(&headers, &state).await?;
    Ok(Json(SessionInfo::from(user)))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(err) = session::end_session(&state, &token).await {
            error!("failed to end session: {err:#}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

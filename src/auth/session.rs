//! Browser session lifecycle.
//!
//! Sessions are an independent credential class from AHP tokens: revoking
//! every token a user owns leaves their browser sessions alone, and logging
//! out leaves their tokens alone. Session ids are opaque 32-byte values with
//! no prefix, so they can never collide with the AHP wire format.

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::store::{SessionRecord, UserRecord};

use super::error::AuthError;
use super::state::AuthState;
use super::utils::{generate_opaque_token, hash_opaque_token};

/// A freshly started session: the raw id goes into the cookie, the store
/// only ever sees its hash.
#[derive(Debug)]
pub struct StartedSession {
    pub session_id: String,
    pub user: UserRecord,
}

/// Persist a new session for `user` and return the raw id for the cookie.
///
/// # Errors
/// `Internal` on storage or RNG failure.
pub async fn start_session(
    state: &AuthState,
    user: &UserRecord,
    now: DateTime<Utc>,
) -> Result<StartedSession, AuthError> {
    let session_id = generate_opaque_token().map_err(AuthError::Internal)?;
    state
        .store()
        .insert_session(SessionRecord {
            session_hash: hash_opaque_token(&session_id),
            user_email: user.email.clone(),
            created_at: now,
            last_seen_at: now,
            expires_at: now + ChronoDuration::seconds(state.config().session_ttl_seconds()),
        })
        .await?;
    Ok(StartedSession {
        session_id,
        user: user.clone(),
    })
}

/// Resolve a presented session id to its user, sliding the expiry forward.
///
/// # Errors
/// `Unauthenticated` when the session is missing or expired, or when the
/// owning user has been deactivated.
pub async fn validate(state: &AuthState, session_id: &str) -> Result<UserRecord, AuthError> {
    let now = Utc::now();
    let session_hash = hash_opaque_token(session_id);
    let Some(session) = state.store().get_session(&session_hash, now).await? else {
        return Err(AuthError::Unauthenticated);
    };
    let Some(user) = state.store().get_user(&session.user_email).await? else {
        return Err(AuthError::Unauthenticated);
    };
    if !user.active {
        return Err(AuthError::Unauthenticated);
    }
    state
        .store()
        .refresh_session(
            &session_hash,
            now + ChronoDuration::seconds(state.config().session_ttl_seconds()),
            now,
        )
        .await?;
    Ok(user)
}

/// Delete the session record. Idempotent: ending a missing session is fine.
///
/// # Errors
/// `Internal` on storage failure.
pub async fn end_session(state: &AuthState, session_id: &str) -> Result<(), AuthError> {
    state
        .store()
        .delete_session(&hash_opaque_token(session_id))
        .await?;
    Ok(())
}

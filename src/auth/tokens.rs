//! AHP token manager.
//!
//! Long-lived opaque bearer credentials scoped to a user. The secret is
//! returned exactly once at creation; the store only ever holds its peppered
//! hash, so `resolve` works by hashing the presented value and looking the
//! hash up. Revocation is a soft delete to preserve the audit trail.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::store::AhpTokenRecord;

use super::error::AuthError;
use super::state::AuthState;
use super::utils::{generate_ahp_secret, hash_ahp_secret, mask_secret};

/// Scope namespace this deployment understands.
pub const KNOWN_SCOPES: &[&str] = &["read", "write", "admin"];

/// The plaintext secret plus the persisted metadata. The secret is not
/// retrievable after this value is dropped.
#[derive(Debug)]
pub struct CreatedToken {
    pub secret: String,
    pub record: AhpTokenRecord,
}

/// Deduplicate and check scopes against the known namespace.
///
/// # Errors
/// `Validation` when the set is empty or names an unknown scope.
pub fn validate_scopes(scopes: &[String]) -> Result<Vec<String>, AuthError> {
    let mut validated: Vec<String> = Vec::new();
    for scope in scopes {
        let scope = scope.trim();
        if scope.is_empty() {
            continue;
        }
        if !KNOWN_SCOPES.contains(&scope) {
            return Err(AuthError::Validation(format!("unknown scope: {scope}")));
        }
        if !validated.iter().any(|existing| existing == scope) {
            validated.push(scope.to_string());
        }
    }
    if validated.is_empty() {
        return Err(AuthError::Validation(
            "at least one scope is required".to_string(),
        ));
    }
    Ok(validated)
}

/// Mint a new token for `user_email`.
///
/// # Errors
/// `Validation` on an empty name or bad scopes, `Internal` on storage or
/// RNG failure.
pub async fn create_token(
    state: &AuthState,
    user_email: &str,
    name: &str,
    scopes: &[String],
    expires_days: Option<i64>,
) -> Result<CreatedToken, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("token name is required".to_string()));
    }
    let scopes = validate_scopes(scopes)?;

    let now = Utc::now();
    let secret = generate_ahp_secret().map_err(AuthError::Internal)?;
    let record = AhpTokenRecord {
        token_id: Uuid::new_v4().to_string(),
        user_email: user_email.to_string(),
        name: name.to_string(),
        scopes,
        secret_hash: hash_ahp_secret(state.pepper(), &secret),
        display_hint: mask_secret(&secret),
        created_at: now,
        expires_at: expires_days.map(|days| now + ChronoDuration::days(days)),
        last_used_at: None,
        active: true,
    };
    state.store().insert_ahp_token(record.clone()).await?;

    Ok(CreatedToken { secret, record })
}

/// Active tokens for `user_email`, newest first. Metadata only.
///
/// # Errors
/// `Internal` on storage failure.
pub async fn list_tokens(
    state: &AuthState,
    user_email: &str,
) -> Result<Vec<AhpTokenRecord>, AuthError> {
    Ok(state.store().list_ahp_tokens(user_email).await?)
}

/// Revoke a token owned by `user_email`. Immediate and irreversible.
///
/// # Errors
/// `NotFound` when the id is unknown or owned by another user; the two are
/// indistinguishable. `Internal` on storage failure.
pub async fn revoke_token(
    state: &AuthState,
    user_email: &str,
    token_id: &str,
) -> Result<(), AuthError> {
    if state.store().revoke_ahp_token(user_email, token_id).await? {
        Ok(())
    } else {
        Err(AuthError::NotFound)
    }
}

/// Resolve a presented secret to its token record.
///
/// The presented value is hashed unconditionally before any lookup, so the
/// unknown-token path does the same work as the known-token path. Inactive
/// and expired tokens fail exactly like unknown ones.
///
/// # Errors
/// `InvalidToken` for unknown, revoked, or expired credentials (and for
/// deactivated owners); `Internal` on storage failure.
pub async fn resolve(
    state: &AuthState,
    presented_secret: &str,
    now: DateTime<Utc>,
) -> Result<AhpTokenRecord, AuthError> {
    let secret_hash = hash_ahp_secret(state.pepper(), presented_secret.trim());
    let Some(record) = state.store().find_ahp_token_by_hash(&secret_hash).await? else {
        return Err(AuthError::InvalidToken);
    };
    if !record.active {
        return Err(AuthError::InvalidToken);
    }
    if let Some(expires_at) = record.expires_at {
        if expires_at <= now {
            return Err(AuthError::InvalidToken);
        }
    }
    let owner = state.store().get_user(&record.user_email).await?;
    if !owner.is_some_and(|user| user.active) {
        return Err(AuthError::InvalidToken);
    }
    state.store().touch_ahp_token(&record.token_id, now).await?;
    Ok(record)
}

//! Error taxonomy for the credential core.
//!
//! Credential failures are deliberately coarse: `InvalidToken` covers
//! unknown, expired, revoked, and already-consumed credentials alike so the
//! boundary never becomes an oracle. `Internal` carries full context for
//! server-side logs only.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed input. Safe to detail to the caller.
    #[error("{0}")]
    Validation(String),

    /// Bad, expired, consumed, or unknown credential. The message never
    /// says which.
    #[error("invalid or expired credential")]
    InvalidToken,

    /// A sliding-window threshold was exceeded. The counter is not leaked.
    #[error("too many requests")]
    RateLimited,

    /// No valid session.
    #[error("authentication required")]
    Unauthenticated,

    /// Entity missing or not owned by the caller; both shapes are identical.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_token_message_does_not_distinguish_causes() {
        // The same wording regardless of why the credential failed.
        assert_eq!(AuthError::InvalidToken.to_string(), "invalid or expired credential");
    }

    #[test]
    fn rate_limited_message_has_no_counter() {
        let message = AuthError::RateLimited.to_string();
        assert!(!message.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn store_errors_become_internal() {
        let err: AuthError = StoreError::Unavailable("down".to_string()).into();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}

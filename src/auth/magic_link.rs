//! Magic-link login engine.
//!
//! A login attempt moves through request (token issued, email dispatched)
//! and verification (token consumed, session started). The stored token is
//! rotated on every successful verification, which is what makes a
//! presented token single-use even if the email is re-sent or the link is
//! intercepted later.

use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::api::email::{self, LoginEmail};
use crate::store::{LoginConsume, LoginTokenState, UserRecord};

use super::error::AuthError;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::{self, StartedSession};
use super::state::AuthState;
use super::utils::{
    default_display_name, generate_opaque_token, hash_opaque_token, normalize_email, valid_email,
};

#[derive(Clone, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub transaction_id: String,
    pub honeypot: String,
}

/// Handle a login-form submission.
///
/// Succeeds uniformly whether or not the account pre-existed, so callers
/// cannot probe for registered addresses. The honeypot path also reports
/// success while doing nothing, to avoid signaling detection to bots.
///
/// # Errors
/// `Validation` for a bad transaction id or malformed email, `RateLimited`
/// when a window is exhausted, `Internal` on infrastructure failure.
pub async fn request_login(
    state: &AuthState,
    client_ip: Option<&str>,
    request: &LoginRequest,
) -> Result<(), AuthError> {
    // The transaction id is checked before anything else touches the
    // engine; replayed or fabricated submissions stop here.
    if !state.guard().redeem(&request.transaction_id) {
        return Err(AuthError::Validation("invalid form submission".to_string()));
    }

    if !request.honeypot.trim().is_empty() {
        debug!("honeypot field populated, dropping login request");
        return Ok(());
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(AuthError::Validation("invalid email address".to_string()));
    }

    if state
        .rate_limiter()
        .check_ip(client_ip, RateLimitAction::Login)
        == RateLimitDecision::Limited
        || state
            .rate_limiter()
            .check_email(&email, RateLimitAction::Login)
            == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let now = Utc::now();
    if state.store().get_user(&email).await?.is_none() {
        state
            .store()
            .upsert_user(UserRecord {
                email: email.clone(),
                name: default_display_name(&email),
                created_at: now,
                active: true,
                login_token: None,
                login_token_uses: 0,
            })
            .await?;
    }

    // Issuing a new token replaces any prior unexpired one: at most one
    // valid login token per user.
    let token = generate_opaque_token().map_err(AuthError::Internal)?;
    let token_state = LoginTokenState {
        token_hash: hash_opaque_token(&token),
        expires_at: now + ChronoDuration::seconds(state.config().login_token_ttl_seconds()),
    };
    state.store().set_login_token(&email, token_state).await?;

    let login_url = build_login_url(state.config().public_base_url(), &email, &token)
        .map_err(AuthError::Internal)?;
    let message = LoginEmail {
        to_email: email,
        login_url,
        mail_token: token,
    };
    email::dispatch(
        state.email(),
        &message,
        Duration::from_secs(state.config().email_timeout_seconds()),
    )
    .await;

    Ok(())
}

/// Verify a presented login token and start a browser session.
///
/// The consume is one conditional write: match the stored hash
/// (constant-time), check the expiry, rotate the stored value. Every
/// failure shape collapses to `InvalidToken`.
///
/// # Errors
/// `InvalidToken` for unknown email, mismatched, expired, or already
/// consumed tokens; `Internal` on infrastructure failure.
pub async fn verify_login(
    state: &AuthState,
    email: &str,
    presented_token: &str,
) -> Result<StartedSession, AuthError> {
    let email = normalize_email(email);
    let now = Utc::now();
    let presented_hash = hash_opaque_token(presented_token.trim());

    // The replacement is a fresh random value nobody has seen, so the
    // presented token can never verify again.
    let replacement_raw = generate_opaque_token().map_err(AuthError::Internal)?;
    let replacement = LoginTokenState {
        token_hash: hash_opaque_token(&replacement_raw),
        expires_at: now + ChronoDuration::seconds(state.config().login_token_ttl_seconds()),
    };

    match state
        .store()
        .consume_login_token(&email, &presented_hash, replacement, now)
        .await?
    {
        LoginConsume::Consumed(user) if user.active => {
            session::start_session(state, &user, now).await
        }
        _ => Err(AuthError::InvalidToken),
    }
}

fn build_login_url(base: &str, email: &str, token: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(base)?;
    url.set_path("/token");
    url.query_pairs_mut()
        .append_pair("mail_token", token)
        .append_pair("email", email);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{default_state, state_with_config, state_with_limiter};
    use crate::auth::rate_limit::SlidingWindowRateLimiter;
    use crate::auth::state::AuthConfig;
    use anyhow::{Context, Result};
    use std::sync::Arc;

    fn login_request(state: &AuthState, email: &str) -> Result<LoginRequest> {
        Ok(LoginRequest {
            email: email.to_string(),
            transaction_id: state.guard().issue()?,
            honeypot: String::new(),
        })
    }

    fn captured_token(sent: &[LoginEmail]) -> Result<String> {
        sent.last()
            .map(|message| message.mail_token.clone())
            .context("no login email captured")
    }

    #[tokio::test]
    async fn login_token_verifies_once_and_never_again() -> Result<()> {
        let (state, sender) = default_state()?;
        let request = login_request(&state, "new@example.com")?;
        request_login(&state, None, &request).await?;

        let token = captured_token(&sender.sent())?;
        let session = verify_login(&state, "new@example.com", &token).await?;
        assert_eq!(session.user.email, "new@example.com");
        assert!(!session.session_id.is_empty());

        let replay = verify_login(&state, "new@example.com", &token).await;
        assert!(matches!(replay, Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn request_creates_user_with_local_part_name() -> Result<()> {
        let (state, _sender) = default_state()?;
        let request = login_request(&state, "Fresh@Example.COM")?;
        request_login(&state, None, &request).await?;

        let user = state
            .store()
            .get_user("fresh@example.com")
            .await?
            .context("user not created")?;
        assert_eq!(user.name, "fresh");
        assert!(user.active);
        Ok(())
    }

    #[tokio::test]
    async fn new_request_invalidates_prior_token() -> Result<()> {
        let (state, sender) = default_state()?;
        let first = login_request(&state, "a@example.com")?;
        request_login(&state, None, &first).await?;
        let first_token = captured_token(&sender.sent())?;

        let second = login_request(&state, "a@example.com")?;
        request_login(&state, None, &second).await?;

        let stale = verify_login(&state, "a@example.com", &first_token).await;
        assert!(matches!(stale, Err(AuthError::InvalidToken)));

        let fresh_token = captured_token(&sender.sent())?;
        assert!(verify_login(&state, "a@example.com", &fresh_token).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn honeypot_reports_success_without_side_effects() -> Result<()> {
        let (state, sender) = default_state()?;
        let request = LoginRequest {
            email: "bot@example.com".to_string(),
            transaction_id: state.guard().issue()?,
            honeypot: "gotcha".to_string(),
        };
        request_login(&state, None, &request).await?;

        assert!(sender.sent().is_empty());
        assert!(state.store().get_user("bot@example.com").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn reused_transaction_id_is_rejected_before_the_engine() -> Result<()> {
        let (state, sender) = default_state()?;
        let request = login_request(&state, "a@example.com")?;
        request_login(&state, None, &request).await?;

        let replayed = request_login(&state, None, &request).await;
        assert!(matches!(replayed, Err(AuthError::Validation(_))));
        assert_eq!(sender.sent().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_email_is_a_validation_error() -> Result<()> {
        let (state, _sender) = default_state()?;
        let request = LoginRequest {
            email: "not-an-email".to_string(),
            transaction_id: state.guard().issue()?,
            honeypot: String::new(),
        };
        let result = request_login(&state, None, &request).await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn eleventh_login_request_is_rate_limited() -> Result<()> {
        let limiter = Arc::new(SlidingWindowRateLimiter::new(
            std::time::Duration::from_secs(600),
            10,
            1000,
            1000,
        ));
        let (state, _sender) = state_with_limiter(limiter)?;

        for _ in 0..10 {
            let request = login_request(&state, "hot@example.com")?;
            request_login(&state, None, &request).await?;
        }
        let request = login_request(&state, "hot@example.com")?;
        let result = request_login(&state, None, &request).await;
        assert!(matches!(result, Err(AuthError::RateLimited)));
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_rejected_at_the_boundary() -> Result<()> {
        use crate::store::LoginTokenState;
        use chrono::Utc;

        let (state, sender) = state_with_config(
            AuthConfig::new("https://auth.example.test".to_string())
                .with_login_token_ttl_seconds(0),
        )?;
        let request = login_request(&state, "edge@example.com")?;
        request_login(&state, None, &request).await?;

        // TTL zero means expires_at == issuance time; already expired.
        let token = captured_token(&sender.sent())?;
        let result = verify_login(&state, "edge@example.com", &token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));

        // One second of validity is enough.
        let hash = crate::auth::utils::hash_opaque_token(&token);
        state
            .store()
            .set_login_token(
                "edge@example.com",
                LoginTokenState {
                    token_hash: hash,
                    expires_at: Utc::now() + chrono::Duration::seconds(1),
                },
            )
            .await?;
        assert!(verify_login(&state, "edge@example.com", &token).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_email_collapses_to_invalid_token() -> Result<()> {
        let (state, _sender) = default_state()?;
        let result = verify_login(&state, "ghost@example.com", "whatever").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn login_url_encodes_query_parameters() -> Result<()> {
        let url = build_login_url("https://auth.example.test", "a+b@example.com", "tok/en")?;
        assert!(url.starts_with("https://auth.example.test/token?"));
        assert!(url.contains("mail_token=tok%2Fen"));
        assert!(url.contains("email=a%2Bb%40example.com"));
        Ok(())
    }
}

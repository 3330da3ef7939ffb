//! AHP-token-to-JWT exchange.
//!
//! Exchanging never consumes the AHP token: one long-lived credential backs
//! any number of short-lived JWTs over its lifetime.

use chrono::{DateTime, Utc};

use super::error::AuthError;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::tokens;

/// The minted bearer token plus response metadata.
#[derive(Debug)]
pub struct ExchangeGrant {
    pub access_token: String,
    pub expires_in: i64,
    /// Space-delimited scopes actually granted.
    pub scope: String,
}

/// Exchange a presented AHP secret for a signed access token.
///
/// The effective scope set is the intersection of what the token grants and
/// what the caller requested; with no request the full grant applies.
///
/// # Errors
/// `RateLimited` when the per-address window is exhausted, `InvalidToken`
/// when the credential does not resolve, `Validation` when the requested
/// scopes intersect the grant to nothing, `Internal` on signing failure.
pub async fn exchange(
    state: &AuthState,
    client_ip: Option<&str>,
    presented_secret: &str,
    requested_scopes: Option<&[String]>,
    now: DateTime<Utc>,
) -> Result<ExchangeGrant, AuthError> {
    if state
        .rate_limiter()
        .check_ip(client_ip, RateLimitAction::Exchange)
        == RateLimitDecision::Limited
    {
        return Err(AuthError::RateLimited);
    }

    let record = tokens::resolve(state, presented_secret, now).await?;

    let effective: Vec<String> = match requested_scopes {
        None => record.scopes.clone(),
        Some(requested) => record
            .scopes
            .iter()
            .filter(|scope| requested.iter().any(|r| r == *scope))
            .cloned()
            .collect(),
    };
    if effective.is_empty() {
        return Err(AuthError::Validation(
            "no requested scope is granted by this token".to_string(),
        ));
    }

    let issued = state
        .token_issuer()
        .issue(&record.user_email, &effective, now)
        .map_err(AuthError::Internal)?;

    Ok(ExchangeGrant {
        access_token: issued.access_token,
        expires_in: issued.expires_in,
        scope: issued.scope,
    })
}

/// Parse the OAuth-style space-delimited `scope` request parameter.
#[must_use]
pub fn parse_scope_param(scope: Option<&str>) -> Option<Vec<String>> {
    let scope = scope?.trim();
    if scope.is_empty() {
        return None;
    }
    Some(scope.split_whitespace().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{default_state, test_user};
    use crate::auth::tokens::create_token;
    use crate::signing::jwt;
    use anyhow::Result;

    fn scopes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn requested_subset_narrows_the_grant() -> Result<()> {
        let (state, _sender) = default_state()?;
        let user = test_user(&state, "a@example.com").await?;
        let created =
            create_token(&state, &user.email, "ci", &scopes(&["read", "write"]), None).await?;

        let now = Utc::now();
        let requested = scopes(&["read"]);
        let grant = exchange(&state, None, &created.secret, Some(&requested), now).await?;
        assert_eq!(grant.scope, "read");

        let claims = jwt::verify_rs256(
            &grant.access_token,
            &state.token_issuer().jwks(),
            state.token_issuer().issuer(),
            now.timestamp(),
        )?;
        assert_eq!(claims.scopes(), vec!["read"]);
        assert_eq!(claims.sub, "a@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn absent_request_grants_the_full_set() -> Result<()> {
        let (state, _sender) = default_state()?;
        let user = test_user(&state, "a@example.com").await?;
        let created =
            create_token(&state, &user.email, "ci", &scopes(&["read", "write"]), None).await?;

        let grant = exchange(&state, None, &created.secret, None, Utc::now()).await?;
        assert_eq!(grant.scope, "read write");
        assert_eq!(
            grant.expires_in,
            state.config().access_token_ttl_seconds()
        );
        Ok(())
    }

    #[tokio::test]
    async fn revoked_token_cannot_be_exchanged() -> Result<()> {
        let (state, _sender) = default_state()?;
        let user = test_user(&state, "a@example.com").await?;
        let created = create_token(&state, &user.email, "ci", &scopes(&["read"]), None).await?;

        crate::auth::tokens::revoke_token(&state, &user.email, &created.record.token_id).await?;
        let result = exchange(&state, None, &created.secret, None, Utc::now()).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn garbage_secret_collapses_to_invalid_token() -> Result<()> {
        let (state, _sender) = default_state()?;
        let result = exchange(&state, None, "ahp_nonsense", None, Utc::now()).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn disjoint_request_is_a_validation_error() -> Result<()> {
        let (state, _sender) = default_state()?;
        let user = test_user(&state, "a@example.com").await?;
        let created = create_token(&state, &user.email, "ci", &scopes(&["read"]), None).await?;

        let requested = scopes(&["admin"]);
        let result =
            exchange(&state, None, &created.secret, Some(&requested), Utc::now()).await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
        Ok(())
    }

    #[test]
    fn scope_param_parsing() {
        assert_eq!(parse_scope_param(None), None);
        assert_eq!(parse_scope_param(Some("  ")), None);
        assert_eq!(
            parse_scope_param(Some("read write")),
            Some(vec!["read".to_string(), "write".to_string()])
        );
    }
}

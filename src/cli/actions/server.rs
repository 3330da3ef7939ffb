use crate::api;
use crate::api::email::LogEmailSender;
use crate::auth::{load_or_generate_pepper, AuthConfig, AuthState, SlidingWindowRateLimiter};
use crate::signing::{KeyRing, TokenIssuer};
use crate::store::MemoryStore;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const PEPPER_FILE: &str = "token_pepper";

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub public_url: String,
    pub issuer: Option<String>,
    pub state_dir: PathBuf,
    pub login_token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub access_token_ttl_seconds: i64,
    pub rate_window_seconds: u64,
    pub login_email_limit: usize,
    pub login_ip_limit: usize,
    pub exchange_ip_limit: usize,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if key material cannot be loaded or generated, or the
/// server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    // Fail fast on unreadable key material; generation only happens when
    // nothing is on disk yet.
    let keys = KeyRing::load_or_generate(&args.state_dir)
        .context("Failed to initialize signing keys")?;
    let pepper = load_or_generate_pepper(&args.state_dir.join(PEPPER_FILE))
        .context("Failed to initialize token pepper")?;

    let mut config = AuthConfig::new(args.public_url)
        .with_login_token_ttl_seconds(args.login_token_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
        .with_rate_window_seconds(args.rate_window_seconds)
        .with_login_email_limit(args.login_email_limit)
        .with_login_ip_limit(args.login_ip_limit)
        .with_exchange_ip_limit(args.exchange_ip_limit);
    if let Some(issuer) = args.issuer {
        config = config.with_issuer(issuer);
    }

    let issuer = Arc::new(TokenIssuer::new(
        keys,
        config.issuer().to_string(),
        config.access_token_ttl_seconds(),
    ));

    let rate_limiter = Arc::new(SlidingWindowRateLimiter::new(
        Duration::from_secs(config.rate_window_seconds()),
        config.login_email_limit(),
        config.login_ip_limit(),
        config.exchange_ip_limit(),
    ));

    // Credential records live behind the Store trait; the bundled backend
    // is the in-process one. Durable deployments swap in their own.
    info!("Using in-memory credential store");
    let state = Arc::new(AuthState::new(
        config,
        Arc::new(MemoryStore::new()),
        issuer,
        rate_limiter,
        Arc::new(LogEmailSender),
        pepper,
    ));

    api::serve(args.port, state).await
}

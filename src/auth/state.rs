//! Auth configuration and shared request-handler state.

use secrecy::{ExposeSecret, SecretBox};
use std::sync::Arc;
use std::time::Duration;

use crate::api::email::EmailSender;
use crate::signing::TokenIssuer;
use crate::store::Store;

use super::guard::FormGuard;
use super::rate_limit::RateLimiter;

const DEFAULT_LOGIN_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 30 * 60;
const DEFAULT_FORM_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_EMAIL_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_RATE_WINDOW_SECONDS: u64 = 15 * 60;
const DEFAULT_LOGIN_EMAIL_LIMIT: usize = 10;
const DEFAULT_LOGIN_IP_LIMIT: usize = 30;
const DEFAULT_EXCHANGE_IP_LIMIT: usize = 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    public_base_url: String,
    issuer: String,
    login_token_ttl_seconds: i64,
    session_ttl_seconds: i64,
    access_token_ttl_seconds: i64,
    form_ttl_seconds: u64,
    email_timeout_seconds: u64,
    rate_window_seconds: u64,
    login_email_limit: usize,
    login_ip_limit: usize,
    exchange_ip_limit: usize,
}

impl AuthConfig {
    #[must_use]
    pub fn new(public_base_url: String) -> Self {
        // The issuer defaults to the public base URL so downstream
        // verifiers have something meaningful out of the box.
        let issuer = public_base_url.trim_end_matches('/').to_string();
        Self {
            public_base_url,
            issuer,
            login_token_ttl_seconds: DEFAULT_LOGIN_TOKEN_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            form_ttl_seconds: DEFAULT_FORM_TTL_SECONDS,
            email_timeout_seconds: DEFAULT_EMAIL_TIMEOUT_SECONDS,
            rate_window_seconds: DEFAULT_RATE_WINDOW_SECONDS,
            login_email_limit: DEFAULT_LOGIN_EMAIL_LIMIT,
            login_ip_limit: DEFAULT_LOGIN_IP_LIMIT,
            exchange_ip_limit: DEFAULT_EXCHANGE_IP_LIMIT,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_login_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.login_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_form_ttl_seconds(mut self, seconds: u64) -> Self {
        self.form_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_email_timeout_seconds(mut self, seconds: u64) -> Self {
        self.email_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_window_seconds(mut self, seconds: u64) -> Self {
        self.rate_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_login_email_limit(mut self, limit: usize) -> Self {
        self.login_email_limit = limit;
        self
    }

    #[must_use]
    pub fn with_login_ip_limit(mut self, limit: usize) -> Self {
        self.login_ip_limit = limit;
        self
    }

    #[must_use]
    pub fn with_exchange_ip_limit(mut self, limit: usize) -> Self {
        self.exchange_ip_limit = limit;
        self
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn login_token_ttl_seconds(&self) -> i64 {
        self.login_token_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn form_ttl_seconds(&self) -> u64 {
        self.form_ttl_seconds
    }

    #[must_use]
    pub fn email_timeout_seconds(&self) -> u64 {
        self.email_timeout_seconds
    }

    #[must_use]
    pub fn rate_window_seconds(&self) -> u64 {
        self.rate_window_seconds
    }

    #[must_use]
    pub fn login_email_limit(&self) -> usize {
        self.login_email_limit
    }

    #[must_use]
    pub fn login_ip_limit(&self) -> usize {
        self.login_ip_limit
    }

    #[must_use]
    pub fn exchange_ip_limit(&self) -> usize {
        self.exchange_ip_limit
    }

    /// Only mark cookies secure when the service is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }
}

/// Everything a request handler needs, shared behind one `Arc`.
pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn Store>,
    issuer: Arc<TokenIssuer>,
    rate_limiter: Arc<dyn RateLimiter>,
    guard: FormGuard,
    email: Arc<dyn EmailSender>,
    /// AHP hashing pepper. Wrapped so it never shows up in debug output.
    pepper: SecretBox<Vec<u8>>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn Store>,
        issuer: Arc<TokenIssuer>,
        rate_limiter: Arc<dyn RateLimiter>,
        email: Arc<dyn EmailSender>,
        pepper: Vec<u8>,
    ) -> Self {
        let guard = FormGuard::new(Duration::from_secs(config.form_ttl_seconds()));
        Self {
            config,
            store,
            issuer,
            rate_limiter,
            guard,
            email,
            pepper: SecretBox::new(Box::new(pepper)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    #[must_use]
    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    #[must_use]
    pub fn guard(&self) -> &FormGuard {
        &self.guard
    }

    pub(crate) fn email(&self) -> &dyn EmailSender {
        self.email.as_ref()
    }

    pub(crate) fn pepper(&self) -> &[u8] {
        self.pepper.expose_secret()
    }
}

//! Login email delivery abstraction.
//!
//! The magic-link engine persists the login token first and only then hands
//! the raw value to an `EmailSender`. Delivery is bounded by a timeout and
//! failures are logged, never propagated: the token is already valid for its
//! window and the client can simply request a resend.
//!
//! The default sender for local dev is `LogEmailSender`, which logs the
//! login link instead of sending real email. Production deployments
//! implement the trait against their mail provider.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct LoginEmail {
    pub to_email: String,
    /// Full magic link carrying `mail_token` and `email` query parameters.
    pub login_url: String,
    /// Raw token for manual entry, shown in the email body.
    pub mail_token: String,
}

/// Email delivery seam between the engine and the mail provider.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error; errors mark the dispatch as
    /// failed but never roll back the issued token.
    async fn send(&self, message: &LoginEmail) -> Result<()>;
}

/// Local dev sender that logs the login link instead of sending email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &LoginEmail) -> Result<()> {
        info!(
            to_email = %message.to_email,
            login_url = %message.login_url,
            "login email send stub"
        );
        Ok(())
    }
}

/// Deliver `message` with a hard upper bound on how long the provider may
/// take. Timeouts and provider errors are logged and swallowed.
pub async fn dispatch(sender: &dyn EmailSender, message: &LoginEmail, timeout: Duration) {
    match tokio::time::timeout(timeout, sender.send(message)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(to_email = %message.to_email, "login email delivery failed: {err:#}"),
        Err(_) => warn!(to_email = %message.to_email, "login email delivery timed out"),
    }
}

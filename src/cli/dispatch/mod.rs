//! Command-line argument dispatch and server initialization.
//!
//! This module maps validated CLI arguments to the appropriate action, such
//! as starting the API server with its full configuration state.

use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let public_url = matches
        .get_one::<String>("public-url")
        .cloned()
        .context("missing required argument: --public-url")?;
    let state_dir = matches
        .get_one::<String>("state-dir")
        .cloned()
        .context("missing required argument: --state-dir")?;

    Ok(Action::Server(Args {
        port,
        public_url,
        issuer: matches.get_one::<String>("issuer").cloned(),
        state_dir: PathBuf::from(state_dir),
        login_token_ttl_seconds: matches
            .get_one::<i64>("login-token-ttl")
            .copied()
            .unwrap_or(900),
        session_ttl_seconds: matches
            .get_one::<i64>("session-ttl")
            .copied()
            .unwrap_or(43200),
        access_token_ttl_seconds: matches
            .get_one::<i64>("access-token-ttl")
            .copied()
            .unwrap_or(1800),
        rate_window_seconds: matches
            .get_one::<u64>("rate-window")
            .copied()
            .unwrap_or(900),
        login_email_limit: matches
            .get_one::<usize>("login-limit")
            .copied()
            .unwrap_or(10),
        login_ip_limit: matches.get_one::<usize>("ip-limit").copied().unwrap_or(30),
        exchange_ip_limit: matches
            .get_one::<usize>("exchange-limit")
            .copied()
            .unwrap_or(60),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn handler_builds_server_action_from_flags() -> Result<()> {
        temp_env::with_vars(
            [
                ("SIGILLO_PORT", None::<&str>),
                ("SIGILLO_PUBLIC_URL", None),
                ("SIGILLO_ISSUER", None),
                ("SIGILLO_STATE_DIR", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "sigillo",
                    "--port",
                    "9090",
                    "--public-url",
                    "https://auth.example.test",
                    "--state-dir",
                    "/tmp/sigillo-state",
                    "--login-limit",
                    "5",
                ]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 9090);
                assert_eq!(args.public_url, "https://auth.example.test");
                assert_eq!(args.state_dir, PathBuf::from("/tmp/sigillo-state"));
                assert_eq!(args.issuer, None);
                assert_eq!(args.login_email_limit, 5);
                assert_eq!(args.session_ttl_seconds, 43200);
                Ok(())
            },
        )
    }
}

//! Anti-automation guard for the login form.
//!
//! Every rendered form carries a single-use transaction id minted here.
//! Submissions must redeem the id before the magic-link engine runs, which
//! stops replayed captures and naive scripted bots. The companion defense is
//! a honeypot field checked by the handler: bots fill it, humans never see
//! it.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::utils::generate_opaque_token;

pub struct FormGuard {
    ttl: Duration,
    pending: Mutex<HashMap<String, Instant>>,
}

impl FormGuard {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a transaction id for a freshly rendered form.
    ///
    /// # Errors
    /// Returns an error if the OS RNG fails.
    pub fn issue(&self) -> Result<String> {
        let id = generate_opaque_token()?;
        if let Ok(mut pending) = self.pending.lock() {
            let ttl = self.ttl;
            pending.retain(|_, minted| minted.elapsed() < ttl);
            pending.insert(id.clone(), Instant::now());
        }
        Ok(id)
    }

    /// Redeem a transaction id. Each id works at most once; unknown, reused,
    /// and expired ids all return `false`.
    pub fn redeem(&self, id: &str) -> bool {
        let Ok(mut pending) = self.pending.lock() else {
            return false;
        };
        match pending.remove(id) {
            Some(minted) => minted.elapsed() < self.ttl,
            None => false,
        }
    }
}

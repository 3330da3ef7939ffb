//! Sliding-window rate limiting for login and exchange flows.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Login,
    Exchange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn check_email(&self, _email: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Per-key rolling windows of attempt timestamps. Each check prunes the
/// window, then records the attempt; the attempt that crosses the threshold
/// is the one that gets `Limited`.
pub struct SlidingWindowRateLimiter {
    window: Duration,
    login_email_limit: usize,
    login_ip_limit: usize,
    exchange_ip_limit: usize,
    hits: Mutex<HashMap<(RateLimitAction, String), VecDeque<Instant>>>,
}

impl SlidingWindowRateLimiter {
    #[must_use]
    pub fn new(
        window: Duration,
        login_email_limit: usize,
        login_ip_limit: usize,
        exchange_ip_limit: usize,
    ) -> Self {
        Self {
            window,
            login_email_limit,
            login_ip_limit,
            exchange_ip_limit,
            hits: Mutex::new(HashMap::new()),
        }
    }

    fn check(&self, key: (RateLimitAction, String), limit: usize) -> RateLimitDecision {
        let now = Instant::now();
        let Ok(mut hits) = self.hits.lock() else {
            // A poisoned lock means a panicked checker; fail closed.
            return RateLimitDecision::Limited;
        };
        let window = self.window;
        let entry = hits.entry(key).or_default();
        while entry
            .front()
            .is_some_and(|hit| now.duration_since(*hit) >= window)
        {
            entry.pop_front();
        }
        if entry.len() >= limit {
            return RateLimitDecision::Limited;
        }
        entry.push_back(now);
        RateLimitDecision::Allowed
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        // Requests without a resolvable source address are not counted; the
        // per-email window still applies to them.
        let Some(ip) = ip else {
            return RateLimitDecision::Allowed;
        };
        let limit = match action {
            RateLimitAction::Login => self.login_ip_limit,
            RateLimitAction::Exchange => self.exchange_ip_limit,
        };
        self.check((action, format!("ip:{ip}")), limit)
    }

    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision {
        self.check((action, format!("email:{email}")), self.login_email_limit)
    }
}

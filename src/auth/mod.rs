//! Credential core: magic-link login, AHP tokens, sessions, and the
//! anti-automation guard rails.
//!
//! ## Threat posture
//!
//! - Raw credentials (login tokens, session ids, AHP secrets) are hashed
//!   before they touch the store; comparisons against stored hashes are
//!   constant-time.
//! - Login tokens are single-use by construction: successful verification
//!   rotates the stored value in the same conditional write that checks it.
//! - Credential failures collapse to one `InvalidToken` shape so the API
//!   cannot be used as an existence or expiry oracle.
//! - Login submissions must redeem a single-use form transaction id and
//!   leave the honeypot field empty before the engine does any work.

pub mod error;
pub mod exchange;
pub mod guard;
pub mod magic_link;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod tokens;
mod utils;

pub use error::AuthError;
pub use rate_limit::{NoopRateLimiter, RateLimiter, SlidingWindowRateLimiter};
pub use state::{AuthConfig, AuthState};
pub use utils::{extract_client_ip, load_or_generate_pepper, AHP_TOKEN_PREFIX};

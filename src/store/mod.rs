//! Credential store abstraction.
//!
//! Every entity is keyed by its unique identifier (users by normalized
//! email, AHP tokens by token id, sessions by the hash of the cookie value)
//! and every state transition that must not race (login-token consumption,
//! token revocation) is a single conditional write. Backends must provide
//! per-key atomicity for those operations; no multi-entity transactions are
//! required.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

mod memory;

pub use memory::MemoryStore;

/// Hash and expiry of the single outstanding login token for a user.
///
/// Only the hash is ever persisted; the raw token travels in the login email
/// and nowhere else.
#[derive(Clone, Debug)]
pub struct LoginTokenState {
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct UserRecord {
    /// Normalized email, unique identifier.
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub login_token: Option<LoginTokenState>,
    /// Number of login tokens this user has successfully consumed.
    pub login_token_uses: u64,
}

#[derive(Clone, Debug)]
pub struct AhpTokenRecord {
    /// Public token identifier (uuid), safe to list and to address revokes.
    pub token_id: String,
    pub user_email: String,
    pub name: String,
    pub scopes: Vec<String>,
    /// Peppered SHA-256 of the secret; the raw value is shown once and gone.
    pub secret_hash: Vec<u8>,
    /// Masked rendering of the secret for dashboards, e.g. `ahp_abcd...wxyz`.
    pub display_hint: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct SessionRecord {
    /// SHA-256 of the opaque cookie value; raw ids never touch the store.
    pub session_hash: Vec<u8>,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of the atomic login-token consume.
#[derive(Debug)]
pub enum LoginConsume {
    /// Token matched and was unexpired; the stored state has been rotated.
    Consumed(UserRecord),
    /// Missing user, missing token, hash mismatch, or expired. Callers must
    /// not distinguish these.
    Rejected,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Key-addressed persistence with per-key conditional writes.
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_user(&self, user: UserRecord) -> Result<(), StoreError>;

    async fn get_user(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Replace the user's login token, invalidating any prior one.
    async fn set_login_token(
        &self,
        email: &str,
        token: LoginTokenState,
    ) -> Result<(), StoreError>;

    /// Atomically consume the login token: succeeds only when the stored
    /// hash matches `presented_hash` (constant-time compare) and
    /// `expires_at > now`. On success the stored state is swapped for
    /// `replacement` and the use counter increments, so the presented token
    /// can never verify twice.
    async fn consume_login_token(
        &self,
        email: &str,
        presented_hash: &[u8],
        replacement: LoginTokenState,
        now: DateTime<Utc>,
    ) -> Result<LoginConsume, StoreError>;

    async fn insert_ahp_token(&self, record: AhpTokenRecord) -> Result<(), StoreError>;

    /// Active tokens for a user, newest first. Metadata only by construction:
    /// callers must not serialize `secret_hash`.
    async fn list_ahp_tokens(&self, email: &str) -> Result<Vec<AhpTokenRecord>, StoreError>;

    async fn find_ahp_token_by_hash(
        &self,
        secret_hash: &[u8],
    ) -> Result<Option<AhpTokenRecord>, StoreError>;

    /// Conditional write `active = true -> false`. Returns `false` when the
    /// token does not exist, is owned by someone else, or was already
    /// revoked; callers must treat all of those identically.
    async fn revoke_ahp_token(&self, email: &str, token_id: &str) -> Result<bool, StoreError>;

    async fn touch_ahp_token(
        &self,
        token_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn insert_session(&self, record: SessionRecord) -> Result<(), StoreError>;

    /// Look up an unexpired session by hash.
    async fn get_session(
        &self,
        session_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, StoreError>;

    /// Slide the expiry forward and record activity.
    async fn refresh_session(
        &self,
        session_hash: &[u8],
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Idempotent delete; removing a missing session is not an error.
    async fn delete_session(&self, session_hash: &[u8]) -> Result<(), StoreError>;
}

//! In-memory reference store.
//!
//! All records live in `HashMap`s behind one async mutex, which makes every
//! trait method a per-key atomic operation. This is the development and test
//! backend; durable backends plug in behind the same trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use super::{
    AhpTokenRecord, LoginConsume, LoginTokenState, SessionRecord, Store, StoreError, UserRecord,
};

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserRecord>,
    tokens: HashMap<String, AhpTokenRecord>,
    sessions: HashMap<Vec<u8>, SessionRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.users.insert(user.email.clone(), user);
        Ok(())
    }

    async fn get_user(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(email).cloned())
    }

    async fn set_login_token(
        &self,
        email: &str,
        token: LoginTokenState,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.users.get_mut(email) {
            user.login_token = Some(token);
        }
        Ok(())
    }

    async fn consume_login_token(
        &self,
        email: &str,
        presented_hash: &[u8],
        replacement: LoginTokenState,
        now: DateTime<Utc>,
    ) -> Result<LoginConsume, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.get_mut(email) else {
            return Ok(LoginConsume::Rejected);
        };
        let Some(state) = user.login_token.as_ref() else {
            return Ok(LoginConsume::Rejected);
        };
        let matches = bool::from(state.token_hash.as_slice().ct_eq(presented_hash));
        if !matches || state.expires_at <= now {
            return Ok(LoginConsume::Rejected);
        }
        user.login_token = Some(replacement);
        user.login_token_uses += 1;
        Ok(LoginConsume::Consumed(user.clone()))
    }

    async fn insert_ahp_token(&self, record: AhpTokenRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.tokens.insert(record.token_id.clone(), record);
        Ok(())
    }

    async fn list_ahp_tokens(&self, email: &str) -> Result<Vec<AhpTokenRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let mut tokens: Vec<AhpTokenRecord> = inner
            .tokens
            .values()
            .filter(|token| token.user_email == email && token.active)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn find_ahp_token_by_hash(
        &self,
        secret_hash: &[u8],
    ) -> Result<Option<AhpTokenRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tokens
            .values()
            .find(|token| bool::from(token.secret_hash.as_slice().ct_eq(secret_hash)))
            .cloned())
    }

    async fn revoke_ahp_token(&self, email: &str, token_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.tokens.get_mut(token_id) {
            Some(token) if token.user_email == email && token.active => {
                token.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_ahp_token(
        &self,
        token_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(token) = inner.tokens.get_mut(token_id) {
            token.last_used_at = Some(now);
        }
        Ok(())
    }

    async fn insert_session(&self, record: SessionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.sessions.insert(record.session_hash.clone(), record);
        Ok(())
    }

    async fn get_session(
        &self,
        session_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .get(session_hash)
            .filter(|session| session.expires_at > now)
            .cloned())
    }

    async fn refresh_session(
        &self,
        session_hash: &[u8],
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(session) = inner.sessions.get_mut(session_hash) {
            session.expires_at = expires_at;
            session.last_seen_at = now;
        }
        Ok(())
    }

    async fn delete_session(&self, session_hash: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.sessions.remove(session_hash);
        Ok(())
    }
}

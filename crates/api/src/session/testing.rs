//! In-memory [`SessionStore`] used by unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use warden_core::client::ClientInfo;
use warden_core::types::{DbId, Timestamp};
use warden_db::models::session::{CreateSession, Session};
use warden_db::store::{SessionStore, StoreError};

/// Vector-backed store mirroring the SQL semantics of `PgSessionStore`, with
/// knobs for forcing collisions, vanished rows and storage failures.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Session>>,
    next_id: Mutex<DbId>,
    collisions_left: AtomicU32,
    create_calls: AtomicU32,
    vanish_on_bump: AtomicBool,
    fail_all: AtomicBool,
}

impl MemoryStore {
    /// Make the next `n` inserts fail with [`StoreError::DuplicateToken`].
    pub fn force_collisions(&self, n: u32) {
        self.collisions_left.store(n, Ordering::SeqCst);
    }

    /// Delete the row instead of bumping it on the next `bump_expiry`.
    pub fn vanish_on_bump(&self) {
        self.vanish_on_bump.store(true, Ordering::SeqCst);
    }

    /// Fail every subsequent operation with a storage error.
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn by_token(&self, token: &str) -> Option<Session> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token == token)
            .cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::Storage(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, input: &CreateSession) -> Result<Session, StoreError> {
        self.check()?;
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let forced = self
            .collisions_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let mut rows = self.rows.lock().unwrap();
        if forced || rows.iter().any(|s| s.token == input.token) {
            return Err(StoreError::DuplicateToken);
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let now = Utc::now();
        let session = Session {
            id: *next_id,
            token: input.token.clone(),
            user_id: input.user_id,
            ip_address: input.client.ip_address.clone(),
            user_agent: input.client.user_agent.clone(),
            device_type: input.client.device_type.clone(),
            browser: input.client.browser.clone(),
            os: input.client.os.clone(),
            is_active: true,
            created_at: now,
            last_activity: now,
            expires_at: input.expires_at,
        };
        rows.push(session.clone());
        Ok(session)
    }

    async fn find_live_match(
        &self,
        user_id: DbId,
        client: &ClientInfo,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_live(now) && s.fingerprint() == *client)
            .max_by_key(|s| (s.created_at, s.id))
            .cloned())
    }

    async fn find_live_by_token(
        &self,
        token: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token == token && s.is_live(now))
            .cloned())
    }

    async fn bump_expiry(
        &self,
        id: DbId,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<Session, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if self.vanish_on_bump.swap(false, Ordering::SeqCst) {
            rows.retain(|s| s.id != id);
        }
        let session = rows
            .iter_mut()
            .find(|s| s.id == id && s.is_active)
            .ok_or(StoreError::NotFound { id })?;
        session.expires_at = session.expires_at.max(expires_at);
        session.last_activity = now;
        Ok(session.clone())
    }

    async fn delete_expired(&self, before: Timestamp) -> Result<u64, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let len = rows.len();
        rows.retain(|s| s.expires_at > before);
        Ok((len - rows.len()) as u64)
    }

    async fn delete_expired_for_user(
        &self,
        user_id: DbId,
        before: Timestamp,
    ) -> Result<u64, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let len = rows.len();
        rows.retain(|s| s.user_id != user_id || s.expires_at > before);
        Ok((len - rows.len()) as u64)
    }

    async fn deactivate_all(&self, user_id: DbId, now: Timestamp) -> Result<u64, StoreError> {
        self.check()?;
        let mut count = 0;
        for session in self
            .rows
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            session.is_active = false;
            session.expires_at = now;
            count += 1;
        }
        Ok(count)
    }

    async fn delete_by_user_and_token(
        &self,
        user_id: DbId,
        token: &str,
    ) -> Result<u64, StoreError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let len = rows.len();
        rows.retain(|s| !(s.user_id == user_id && s.token == token && s.is_active));
        Ok((len - rows.len()) as u64)
    }
}

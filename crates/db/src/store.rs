//! The session store seam.
//!
//! [`SessionStore`] is the narrow set of durable operations the session
//! service is allowed to perform. [`PgSessionStore`] implements it on top of
//! [`SessionRepo`]; tests substitute in-memory doubles.

use async_trait::async_trait;
use warden_core::client::ClientInfo;
use warden_core::types::{DbId, Timestamp};

use crate::models::session::{CreateSession, Session};
use crate::repositories::SessionRepo;
use crate::DbPool;

/// Name of the unique constraint on `sessions.token`.
pub const TOKEN_CONSTRAINT: &str = "uq_sessions_token";

/// PostgreSQL SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors raised by a [`SessionStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The row an update expected to find has vanished or is no longer active.
    #[error("Session {id} not found")]
    NotFound { id: DbId },

    /// The generated token collided with an existing one.
    #[error("Session token already exists")]
    DuplicateToken,

    /// Any other storage failure.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Durable CRUD over session rows. Implementations hold no business policy.
///
/// Zero rows affected is a normal outcome for the delete/update-many
/// operations and is reported as `Ok(0)`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session. Fails with [`StoreError::DuplicateToken`] when
    /// the token is already taken.
    async fn create(&self, input: &CreateSession) -> Result<Session, StoreError>;

    /// The most recently created live session of `user_id` with exactly this
    /// fingerprint.
    async fn find_live_match(
        &self,
        user_id: DbId,
        client: &ClientInfo,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    /// The live session presenting `token`, if any.
    async fn find_live_by_token(
        &self,
        token: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError>;

    /// Push `expires_at` forward and set `last_activity = now`. Fails with
    /// [`StoreError::NotFound`] if the row is gone or inactive.
    async fn bump_expiry(
        &self,
        id: DbId,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<Session, StoreError>;

    /// Delete all rows with `expires_at <= before`.
    async fn delete_expired(&self, before: Timestamp) -> Result<u64, StoreError>;

    /// Delete one user's rows with `expires_at <= before`.
    async fn delete_expired_for_user(
        &self,
        user_id: DbId,
        before: Timestamp,
    ) -> Result<u64, StoreError>;

    /// Set `is_active = false, expires_at = now` on every active row of a user.
    async fn deactivate_all(&self, user_id: DbId, now: Timestamp) -> Result<u64, StoreError>;

    /// Delete the active row matching both `user_id` and `token`.
    async fn delete_by_user_and_token(&self, user_id: DbId, token: &str)
        -> Result<u64, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL implementation
// ---------------------------------------------------------------------------

/// [`SessionStore`] backed by the `sessions` table.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Whether `err` is a unique violation on the session token.
fn is_token_collision(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err.constraint() == Some(TOKEN_CONSTRAINT)
        }
        _ => false,
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, input: &CreateSession) -> Result<Session, StoreError> {
        SessionRepo::create(&self.pool, input).await.map_err(|e| {
            if is_token_collision(&e) {
                StoreError::DuplicateToken
            } else {
                StoreError::Storage(e)
            }
        })
    }

    async fn find_live_match(
        &self,
        user_id: DbId,
        client: &ClientInfo,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::find_live_match(&self.pool, user_id, client, now).await?)
    }

    async fn find_live_by_token(
        &self,
        token: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, StoreError> {
        Ok(SessionRepo::find_live_by_token(&self.pool, token, now).await?)
    }

    async fn bump_expiry(
        &self,
        id: DbId,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<Session, StoreError> {
        SessionRepo::bump_expiry(&self.pool, id, expires_at, now)
            .await?
            .ok_or(StoreError::NotFound { id })
    }

    async fn delete_expired(&self, before: Timestamp) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_expired(&self.pool, before).await?)
    }

    async fn delete_expired_for_user(
        &self,
        user_id: DbId,
        before: Timestamp,
    ) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_expired_for_user(&self.pool, user_id, before).await?)
    }

    async fn deactivate_all(&self, user_id: DbId, now: Timestamp) -> Result<u64, StoreError> {
        Ok(SessionRepo::deactivate_all(&self.pool, user_id, now).await?)
    }

    async fn delete_by_user_and_token(
        &self,
        user_id: DbId,
        token: &str,
    ) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_by_user_and_token(&self.pool, user_id, token).await?)
    }
}

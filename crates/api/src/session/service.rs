//! The session reconciler.
//!
//! [`SessionService`] is the only place that decides whether a login reuses an
//! existing session or mints a new one. Repeated logins from the same device
//! fingerprint get the same token back with a pushed-out expiry; a new
//! fingerprint gets a new token.
//!
//! Every operation has an `*_at` variant taking the clock value explicitly.

use std::sync::Arc;

use chrono::Utc;
use warden_core::client::ClientInfo;
use warden_core::session::{generate_session_token, ExpiryPolicy};
use warden_core::types::{DbId, Timestamp};
use warden_db::models::session::{CreateSession, Session};
use warden_db::store::{SessionStore, StoreError};

/// Attempts at inserting a session before a token collision is surfaced.
pub const MAX_TOKEN_ATTEMPTS: u32 = 5;

/// Message returned for unknown, expired or revoked tokens.
pub const INVALID_SESSION: &str = "Invalid or expired session";

/// Errors surfaced by [`SessionService`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The presented session is unknown, inactive or expired.
    #[error("{0}")]
    Auth(String),

    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Reconciles logins against stored sessions.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    policy: ExpiryPolicy,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, policy: ExpiryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    // -----------------------------------------------------------------------
    // Issue / refresh
    // -----------------------------------------------------------------------

    /// Return a token for `user_id` on the device described by `client`,
    /// reusing the device's live session when one exists.
    pub async fn create_or_refresh(
        &self,
        user_id: DbId,
        client: &ClientInfo,
    ) -> Result<String, SessionError> {
        self.create_or_refresh_at(user_id, client, Utc::now()).await
    }

    pub async fn create_or_refresh_at(
        &self,
        user_id: DbId,
        client: &ClientInfo,
        now: Timestamp,
    ) -> Result<String, SessionError> {
        let expires_at = self.policy.compute_expiry(now);

        if let Some(existing) = self.store.find_live_match(user_id, client, now).await? {
            match self.store.bump_expiry(existing.id, expires_at, now).await {
                Ok(session) => {
                    tracing::debug!(
                        user_id,
                        session_id = session.id,
                        expires_at = %session.expires_at,
                        "Reused live session"
                    );
                    return Ok(session.token);
                }
                Err(StoreError::NotFound { id }) => {
                    tracing::debug!(user_id, session_id = id, "Matched session vanished, issuing new one");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let session = self.insert_with_fresh_token(user_id, client, expires_at).await?;
        tracing::info!(
            user_id,
            session_id = session.id,
            expires_at = %session.expires_at,
            "Issued new session"
        );
        Ok(session.token)
    }

    /// Insert a session, regenerating the token on collision.
    async fn insert_with_fresh_token(
        &self,
        user_id: DbId,
        client: &ClientInfo,
        expires_at: Timestamp,
    ) -> Result<Session, SessionError> {
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let input = CreateSession {
                token: generate_session_token(),
                user_id,
                client: client.clone(),
                expires_at,
            };
            match self.store.create(&input).await {
                Ok(session) => return Ok(session),
                Err(StoreError::DuplicateToken) => {
                    tracing::warn!(user_id, attempt, "Session token collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::DuplicateToken.into())
    }

    // -----------------------------------------------------------------------
    // Authenticate / revoke
    // -----------------------------------------------------------------------

    /// Resolve a bearer token to its live session.
    pub async fn authenticate(&self, token: &str) -> Result<Session, SessionError> {
        self.authenticate_at(token, Utc::now()).await
    }

    pub async fn authenticate_at(
        &self,
        token: &str,
        now: Timestamp,
    ) -> Result<Session, SessionError> {
        self.store
            .find_live_by_token(token, now)
            .await?
            .ok_or_else(|| SessionError::Auth(INVALID_SESSION.into()))
    }

    /// Delete the caller's session. Fails with [`SessionError::Auth`] when no
    /// active session matches both `user_id` and `token`.
    pub async fn logout(&self, user_id: DbId, token: &str) -> Result<(), SessionError> {
        let deleted = self.store.delete_by_user_and_token(user_id, token).await?;
        if deleted == 0 {
            return Err(SessionError::Auth(INVALID_SESSION.into()));
        }
        tracing::info!(user_id, "Session logged out");
        Ok(())
    }

    /// Deactivate every active session of `user_id`. Returns the number of
    /// sessions that were newly deactivated.
    ///
    /// Call this before issuing the replacement session after a credential
    /// change, otherwise the replacement is revoked too.
    pub async fn invalidate_all(&self, user_id: DbId) -> Result<u64, SessionError> {
        self.invalidate_all_at(user_id, Utc::now()).await
    }

    pub async fn invalidate_all_at(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, SessionError> {
        let count = self.store.deactivate_all(user_id, now).await?;
        tracing::info!(user_id, count, "Invalidated all sessions");
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Housekeeping
    // -----------------------------------------------------------------------

    /// Delete every session expired at the current time.
    pub async fn purge_expired(&self) -> Result<u64, SessionError> {
        self.purge_expired_at(Utc::now()).await
    }

    pub async fn purge_expired_at(&self, now: Timestamp) -> Result<u64, SessionError> {
        Ok(self.store.delete_expired(now).await?)
    }

    /// Delete one user's expired sessions. Failures are logged and ignored.
    pub async fn purge_expired_for_user(&self, user_id: DbId) {
        self.purge_expired_for_user_at(user_id, Utc::now()).await
    }

    pub async fn purge_expired_for_user_at(&self, user_id: DbId, now: Timestamp) {
        match self.store.delete_expired_for_user(user_id, now).await {
            Ok(0) => {}
            Ok(deleted) => tracing::debug!(user_id, deleted, "Purged expired sessions for user"),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to purge expired sessions for user");
            }
        }
    }
}

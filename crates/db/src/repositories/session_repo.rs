//! Repository for the `sessions` table.

use sqlx::PgPool;
use warden_core::client::ClientInfo;
use warden_core::types::{DbId, Timestamp};

use crate::models::session::{CreateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, token, user_id, ip_address, user_agent, device_type, browser, os, \
                        is_active, created_at, last_activity, expires_at";

/// Provides CRUD operations for sessions. Holds no business policy.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    ///
    /// `created_at` and `last_activity` come from the column defaults.
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions
                (token, user_id, ip_address, user_agent, device_type, browser, os, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(&input.token)
            .bind(input.user_id)
            .bind(&input.client.ip_address)
            .bind(&input.client.user_agent)
            .bind(&input.client.device_type)
            .bind(&input.client.browser)
            .bind(&input.client.os)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find the most recently created live session of `user_id` whose
    /// fingerprint equals `client` field by field (NULL matches NULL).
    pub async fn find_live_match(
        pool: &PgPool,
        user_id: DbId,
        client: &ClientInfo,
        now: Timestamp,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE user_id = $1
               AND ip_address IS NOT DISTINCT FROM $2
               AND user_agent IS NOT DISTINCT FROM $3
               AND device_type IS NOT DISTINCT FROM $4
               AND browser IS NOT DISTINCT FROM $5
               AND os IS NOT DISTINCT FROM $6
               AND is_active = true
               AND expires_at > $7
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .bind(&client.ip_address)
            .bind(&client.user_agent)
            .bind(&client.device_type)
            .bind(&client.browser)
            .bind(&client.os)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Find a live session by its bearer token.
    pub async fn find_live_by_token(
        pool: &PgPool,
        token: &str,
        now: Timestamp,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE token = $1
               AND is_active = true
               AND expires_at > $2"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(token)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// Extend an active session's expiry and record activity.
    ///
    /// The expiry never moves backward. Returns `None` if the row is gone or
    /// no longer active.
    pub async fn bump_expiry(
        pool: &PgPool,
        id: DbId,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET
                expires_at = GREATEST(expires_at, $2),
                last_activity = $3
             WHERE id = $1 AND is_active = true
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .bind(expires_at)
            .bind(now)
            .fetch_optional(pool)
            .await
    }

    /// List all sessions of a user, newest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete every session expiring at or before `before`. Returns the count.
    pub async fn delete_expired(pool: &PgPool, before: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a single user's sessions expiring at or before `before`.
    pub async fn delete_expired_for_user(
        pool: &PgPool,
        user_id: DbId,
        before: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= $2")
            .bind(user_id)
            .bind(before)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Deactivate and force-expire all active sessions of a user.
    ///
    /// Returns the count of newly deactivated rows; already-inactive rows are
    /// left untouched.
    pub async fn deactivate_all(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = false, expires_at = $2
             WHERE user_id = $1 AND is_active = true",
        )
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete the active session matching both `user_id` and `token`.
    pub async fn delete_by_user_and_token(
        pool: &PgPool,
        user_id: DbId,
        token: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE user_id = $1 AND token = $2 AND is_active = true",
        )
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

//! Session model and DTOs.

use sqlx::FromRow;
use warden_core::client::ClientInfo;
use warden_core::session::is_live;
use warden_core::types::{DbId, Timestamp};

/// A session row from the `sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    /// Bearer credential presented by the client. Never changes once issued.
    pub token: String,
    pub user_id: DbId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
    pub expires_at: Timestamp,
}

impl Session {
    /// Whether the session can still authenticate requests at `now`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        is_live(self.is_active, self.expires_at, now)
    }

    /// The device fingerprint captured when the session was issued.
    pub fn fingerprint(&self) -> ClientInfo {
        ClientInfo {
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            device_type: self.device_type.clone(),
            browser: self.browser.clone(),
            os: self.os.clone(),
        }
    }
}

/// DTO for creating a new session.
///
/// `created_at` and `last_activity` are always set by the store.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub token: String,
    pub user_id: DbId,
    pub client: ClientInfo,
    pub expires_at: Timestamp,
}

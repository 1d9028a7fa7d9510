use std::sync::Arc;

use crate::config::ServerConfig;
use crate::session::SessionService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: warden_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Session reconciler shared with the cleanup job.
    pub sessions: Arc<SessionService>,
}

impl AppState {
    /// Wire the state from a pool and configuration, backing sessions with
    /// the PostgreSQL store.
    pub fn new(pool: warden_db::DbPool, config: ServerConfig) -> Self {
        let store = Arc::new(warden_db::store::PgSessionStore::new(pool.clone()));
        let sessions = Arc::new(SessionService::new(store, config.session.policy));
        Self {
            pool,
            config: Arc::new(config),
            sessions,
        }
    }
}

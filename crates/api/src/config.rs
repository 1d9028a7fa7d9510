use std::str::FromStr;

use cron::Schedule;
use warden_core::session::{ExpiryPolicy, DEFAULT_EXPIRY_DAYS};

/// Default cleanup schedule: 00:01 every day (sec min hour dom month dow).
pub const DEFAULT_CLEANUP_CRON: &str = "0 1 0 * * *";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for background jobs to stop after the server drains
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Session expiry and cleanup settings.
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    ///
    /// See [`SessionConfig::from_env`] for the session variables.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let session = SessionConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            session,
        }
    }
}

/// Session lifetime and housekeeping configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How far ahead sessions expire, and in which offset midnight falls.
    pub policy: ExpiryPolicy,
    /// When the expired-session purge runs, evaluated in the policy offset.
    pub cleanup_schedule: Schedule,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: ExpiryPolicy::default(),
            cleanup_schedule: Schedule::from_str(DEFAULT_CLEANUP_CRON)
                .expect("default cleanup schedule is valid"),
        }
    }
}

impl SessionConfig {
    /// Load session configuration from environment variables.
    ///
    /// | Env Var                      | Default        |
    /// |------------------------------|----------------|
    /// | `SESSION_EXPIRY_DAYS`        | `1`            |
    /// | `SESSION_UTC_OFFSET_MINUTES` | `0`            |
    /// | `SESSION_CLEANUP_CRON`       | `0 1 0 * * *`  |
    pub fn from_env() -> Self {
        let days: i64 = std::env::var("SESSION_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_EXPIRY_DAYS.to_string())
            .parse()
            .expect("SESSION_EXPIRY_DAYS must be a valid i64");

        let offset_minutes: i32 = std::env::var("SESSION_UTC_OFFSET_MINUTES")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("SESSION_UTC_OFFSET_MINUTES must be a valid i32");

        let policy = ExpiryPolicy::new(days, offset_minutes)
            .unwrap_or_else(|e| panic!("Invalid session expiry settings: {e}"));

        let cron_expr =
            std::env::var("SESSION_CLEANUP_CRON").unwrap_or_else(|_| DEFAULT_CLEANUP_CRON.into());
        let cleanup_schedule = Schedule::from_str(&cron_expr)
            .unwrap_or_else(|e| panic!("Invalid SESSION_CLEANUP_CRON '{cron_expr}': {e}"));

        Self {
            policy,
            cleanup_schedule,
        }
    }
}

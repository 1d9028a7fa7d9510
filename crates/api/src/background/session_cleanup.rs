//! Scheduled purge of expired sessions.
//!
//! Runs the session service's `purge_expired` on a cron schedule evaluated in
//! the expiry policy's UTC offset, so the default `0 1 0 * * *` fires one
//! minute after sessions roll over at local midnight. Purges run one after
//! another inside a single task and never overlap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use warden_core::types::Timestamp;

use crate::session::SessionService;

/// Recurring expired-session cleanup job.
pub struct SessionCleanup {
    sessions: Arc<SessionService>,
    schedule: Schedule,
    offset: FixedOffset,
}

impl SessionCleanup {
    pub fn new(sessions: Arc<SessionService>, schedule: Schedule) -> Self {
        let offset = sessions.policy().offset();
        Self {
            sessions,
            schedule,
            offset,
        }
    }

    /// The first scheduled run strictly after `now`.
    pub fn next_run(&self, now: Timestamp) -> Option<Timestamp> {
        self.schedule
            .after(&now.with_timezone(&self.offset))
            .next()
            .map(|at| at.with_timezone(&Utc))
    }

    /// Purge once. Errors are logged, never returned.
    pub async fn run_once(&self) -> u64 {
        match self.sessions.purge_expired().await {
            Ok(deleted) => {
                if deleted > 0 {
                    tracing::info!(deleted, "Session cleanup: purged expired sessions");
                } else {
                    tracing::debug!("Session cleanup: no expired sessions");
                }
                deleted
            }
            Err(e) => {
                tracing::error!(error = %e, "Session cleanup: purge failed");
                0
            }
        }
    }

    /// Spawn the job onto the runtime. Stop it by cancelling `cancel`.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Run the cleanup loop until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(offset = %self.offset, "Session cleanup job started");

        loop {
            let Some(next) = self.next_run(Utc::now()) else {
                tracing::warn!("Session cleanup: schedule has no future runs, stopping");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_run = %next, "Session cleanup: waiting for next run");

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Session cleanup job stopping");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    self.run_once().await;
                }
            }
        }
    }
}

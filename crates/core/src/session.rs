//! Session expiry policy and token generation.
//!
//! Sessions expire at a calendar midnight rather than after a fixed
//! duration: a session issued at any point during a day stays valid until
//! 00:00 of the day `days` later, evaluated in a configurable fixed UTC
//! offset. This module lives in `core` so it can be unit tested without a
//! store.

use chrono::{Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use rand::distr::{Alphanumeric, SampleString};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Default number of calendar days until a session expires.
pub const DEFAULT_EXPIRY_DAYS: i64 = 1;

/// Upper bound on the configurable expiry, in days.
pub const MAX_EXPIRY_DAYS: i64 = 365;

/// Length of a generated session token, in characters.
pub const SESSION_TOKEN_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Expiry policy
// ---------------------------------------------------------------------------

/// Computes session expiry timestamps and evaluates liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    days: i64,
    offset: FixedOffset,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            days: DEFAULT_EXPIRY_DAYS,
            offset: Utc.fix(),
        }
    }
}

impl ExpiryPolicy {
    /// Build a policy expiring `days` calendar days ahead, with midnight
    /// evaluated at `offset_minutes` east of UTC.
    pub fn new(days: i64, offset_minutes: i32) -> Result<Self, CoreError> {
        if !(1..=MAX_EXPIRY_DAYS).contains(&days) {
            return Err(CoreError::Validation(format!(
                "Session expiry must be between 1 and {MAX_EXPIRY_DAYS} days, got {days}"
            )));
        }

        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid UTC offset of {offset_minutes} minutes"
                ))
            })?;

        Ok(Self { days, offset })
    }

    /// Number of calendar days until expiry.
    pub fn days(&self) -> i64 {
        self.days
    }

    /// The offset in which midnight is evaluated.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Midnight (00:00:00.000 in the policy offset) of the day `now + days`.
    pub fn compute_expiry(&self, now: Timestamp) -> Timestamp {
        let local = now.with_timezone(&self.offset);
        let target_day = (local + Duration::days(self.days)).date_naive();
        let local_midnight = target_day.and_time(NaiveTime::MIN);
        let utc_midnight =
            local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc_midnight)
    }
}

/// A session is live only while it is flagged active and strictly before
/// its expiry.
pub fn is_live(is_active: bool, expires_at: Timestamp, now: Timestamp) -> bool {
    is_active && expires_at > now
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Generate an opaque bearer token from the thread-local CSPRNG.
pub fn generate_session_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), SESSION_TOKEN_LEN)
}

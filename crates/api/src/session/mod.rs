//! Session reconciliation: one live session per user and device.
//!
//! - [`service::SessionService`] -- Issues, refreshes, authenticates and
//!   revokes sessions over a [`warden_db::store::SessionStore`].

pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use service::{SessionError, SessionService};

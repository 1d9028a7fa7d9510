//! Warden domain core.
//!
//! Pure logic with no I/O: shared id/timestamp types, the domain error
//! enum, the session expiry policy, client fingerprinting, and credential
//! rules. Both the `db` and `api` crates depend on this one.

pub mod client;
pub mod credentials;
pub mod error;
pub mod session;
pub mod types;

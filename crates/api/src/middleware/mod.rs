//! Request extractors.
//!
//! - [`auth::AuthUser`] -- Resolves a Bearer session token to its user.
//! - [`client::ClientFingerprint`] -- Derives the device fingerprint from headers.

pub mod auth;
pub mod client;

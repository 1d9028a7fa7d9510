//! Credential primitives.
//!
//! - [`password`] -- Argon2id hashing and verification.

pub mod password;

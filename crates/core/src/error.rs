//! Domain error type shared by every crate.

use crate::types::DbId;

/// Failures raised by domain rules, independent of transport and storage.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced row does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input broke a credential or configuration rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A unique identity (username or email) is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad credentials, an unknown or expired session, or a deactivated
    /// account.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

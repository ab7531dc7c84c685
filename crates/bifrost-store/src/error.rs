//! Store error types.

use bifrost_core::db::DatabaseError;

use crate::session::IsolationLevel;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the persistence layer.
///
/// All variants are raised synchronously by the call that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Malformed resource id: {0}")]
    Format(String),

    #[error("Missing registry entry: {0}")]
    MissingRegistryEntry(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Isolation level {0} is not supported by the backing engine")]
    UnsupportedIsolation(IsolationLevel),

    #[error("Invalid session state: {0}")]
    SessionState(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e.into())
    }
}

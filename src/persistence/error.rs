//! Error types for persistence contracts.

use thiserror::Error;

/// Defines the possible errors a persistence backend can report.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The requested record does not exist.
    #[error("Record not found")]
    NotFound,

    /// The backend rejected or failed the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

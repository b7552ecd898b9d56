//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// Engine-specific driver failures are normalized to this shape so callers
/// never match on sqlx internals.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connecting to or opening the database failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A statement failed to execute.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A uniqueness constraint was violated.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Invalid input (for example an unsafe identifier).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A write failed and the subsequent rollback failed as well.
    ///
    /// The database state is suspect; both failures are preserved so the
    /// caller can tell this apart from a clean rollback.
    #[error("transaction failed: {cause}; rollback also failed: {rollback}")]
    RollbackFailed {
        /// The error that triggered the rollback.
        cause: String,
        /// The error the rollback itself produced.
        rollback: String,
    },
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Conflict(db.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::ConnectionFailed(err.to_string())
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

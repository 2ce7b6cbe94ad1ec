//! Persistence error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Backend unreachable, pool exhausted, or operation timed out.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Query error: {0}")]
    Query(String),

    /// A stored row could not be mapped back to a snapshot.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid database settings: {0}")]
    InvalidSettings(String),
}

impl PersistenceError {
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Connection(e.to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Constraint(e.to_string())
            }
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => Self::Decode(e.to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

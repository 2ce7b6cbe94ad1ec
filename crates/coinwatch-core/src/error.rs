//! Error types for coinwatch-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

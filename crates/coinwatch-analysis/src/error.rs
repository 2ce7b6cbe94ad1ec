//! Analysis error types.

use coinwatch_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Insufficient data: need {needed} points, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The statistic has no value for this input (e.g. zero variance).
    #[error("Undefined result: {0}")]
    Undefined(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

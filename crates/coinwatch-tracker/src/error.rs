//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] coinwatch_feed::FeedError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] coinwatch_persistence::PersistenceError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] coinwatch_analysis::AnalysisError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] coinwatch_telemetry::TelemetryError),

    #[error("Collection cycle {cycle} failed: {reason}")]
    CycleFailed { cycle: u64, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

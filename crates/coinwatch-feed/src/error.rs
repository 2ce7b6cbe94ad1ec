//! Feed error types.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by market data API (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl FeedError {
    /// Whether the retry loop may try again after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::RateLimited { .. } => "rate_limited",
            Self::Parse(_) => "parse",
            Self::Http { .. } => "http",
            Self::InvalidRequest(_) => "invalid_request",
            Self::HttpClient(_) => "http_client",
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;

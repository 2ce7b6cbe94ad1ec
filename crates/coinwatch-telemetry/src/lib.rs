//! Prometheus metrics and structured logging for coinwatch.
//!
//! - Structured logging with tracing (JSON in production)
//! - Prometheus metrics for ingestion cycles, fetches and storage
//! - Run summary output (hourly and at shutdown)
//! - Optional `/metrics` and `/health` HTTP endpoint

pub mod error;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod summary;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use server::{metrics_router, run_metrics_server};
pub use summary::{CoinRunStats, RunSummary};

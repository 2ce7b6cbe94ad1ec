//! Crypto price tracker.
//!
//! Wires the workspace together:
//! - Configuration loading and validation
//! - Ingestion scheduler (fetch, upsert, prune)
//! - CLI commands for collection and trend analysis

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod scheduler;

pub use app::Application;
pub use cli::{Cli, Command};
pub use config::{AppConfig, Settings};
pub use error::{AppError, AppResult};
pub use scheduler::{
    CycleReport, Scheduler, SchedulerState, SchedulerStats, SnapshotSink, SnapshotSource,
};

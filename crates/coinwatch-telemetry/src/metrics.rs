//! Prometheus metrics for coinwatch.
//!
//! Covers:
//! - Ingestion cycles (outcome, duration, last success)
//! - Market data fetches and retries
//! - Rows inserted and pruned
//! - Scheduler state
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means duplicate
//! metric names, which must crash at startup instead of dropping metrics.
//! These panics only occur during static initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_histogram, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, TextEncoder,
};

/// Completed ingestion cycles.
/// Labels: outcome (success/failure)
pub static CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinwatch_cycles_total",
        "Completed ingestion cycles by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Wall-clock duration of an ingestion cycle in seconds.
pub static CYCLE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "coinwatch_cycle_duration_seconds",
        "Ingestion cycle duration in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .unwrap()
});

/// Snapshots received from the market data API.
pub static SNAPSHOTS_FETCHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinwatch_snapshots_fetched_total",
        "Snapshots received from the market data API",
        &["coin_id"]
    )
    .unwrap()
});

/// Rows newly inserted into the price series.
pub static ROWS_INSERTED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "coinwatch_rows_inserted_total",
        "Rows newly inserted into the price series"
    )
    .unwrap()
});

/// Rows removed by retention pruning.
pub static ROWS_PRUNED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "coinwatch_rows_pruned_total",
        "Rows removed by retention pruning"
    )
    .unwrap()
});

/// Market data request retries.
/// Labels: reason (network/rate_limited)
pub static FETCH_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "coinwatch_fetch_retries_total",
        "Market data request retries by reason",
        &["reason"]
    )
    .unwrap()
});

/// Unix time of the last successful cycle.
pub static LAST_SUCCESS_TIMESTAMP: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "coinwatch_last_success_timestamp_seconds",
        "Unix time of the last successful ingestion cycle"
    )
    .unwrap()
});

/// Scheduler state machine current state.
/// Labels: state (idle/fetching/persisting/stopping)
pub static SCHEDULER_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "coinwatch_scheduler_state",
        "Scheduler current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

const SCHEDULER_STATES: [&str; 4] = ["idle", "fetching", "persisting", "stopping"];

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a finished cycle.
    pub fn cycle_completed(success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "failure" };
        CYCLES_TOTAL.with_label_values(&[outcome]).inc();
        CYCLE_DURATION_SECONDS.observe(duration_secs);
        if success {
            LAST_SUCCESS_TIMESTAMP.set(chrono::Utc::now().timestamp() as f64);
        }
    }

    pub fn snapshot_fetched(coin_id: &str) {
        SNAPSHOTS_FETCHED_TOTAL.with_label_values(&[coin_id]).inc();
    }

    pub fn rows_inserted(count: u64) {
        ROWS_INSERTED_TOTAL.inc_by(count as f64);
    }

    pub fn rows_pruned(count: u64) {
        ROWS_PRUNED_TOTAL.inc_by(count as f64);
    }

    /// Record a retried market data request.
    pub fn fetch_retry(reason: &str) {
        FETCH_RETRIES_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Set the active scheduler state; all others are reset to 0.
    pub fn scheduler_state_set(state: &str) {
        for s in &SCHEDULER_STATES {
            SCHEDULER_STATE.with_label_values(&[s]).set(0.0);
        }
        SCHEDULER_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Render every registered metric in the text exposition format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

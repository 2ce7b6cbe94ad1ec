//! Ingestion scheduler.
//!
//! One cooperative loop, one cycle per poll interval:
//! fetch all tracked coins, upsert the batch, prune past the retention
//! horizon. Cycle failures are logged and counted; the loop keeps going.
//! Cancellation is only observed between cycles.

use chrono::{DateTime, Utc};
use coinwatch_core::{BoxFuture, CoinSnapshot, TrackingConfig};
use coinwatch_feed::{FeedError, FeedResult, MarketDataClient};
use coinwatch_persistence::{PersistenceError, PersistenceResult, PriceStore};
use coinwatch_telemetry::Metrics;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Where snapshots come from.
pub trait SnapshotSource: Send + Sync {
    fn fetch_snapshot<'a>(
        &'a self,
        coin_ids: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, FeedResult<Vec<CoinSnapshot>>>;
}

/// Where snapshots go.
pub trait SnapshotSink: Send + Sync {
    fn upsert_snapshots<'a>(
        &'a self,
        batch: &'a [CoinSnapshot],
    ) -> BoxFuture<'a, PersistenceResult<u64>>;

    fn prune(&self, older_than: DateTime<Utc>) -> BoxFuture<'_, PersistenceResult<u64>>;
}

impl SnapshotSource for MarketDataClient {
    fn fetch_snapshot<'a>(
        &'a self,
        coin_ids: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, FeedResult<Vec<CoinSnapshot>>> {
        Box::pin(MarketDataClient::fetch_snapshot(self, coin_ids))
    }
}

impl SnapshotSink for PriceStore {
    fn upsert_snapshots<'a>(
        &'a self,
        batch: &'a [CoinSnapshot],
    ) -> BoxFuture<'a, PersistenceResult<u64>> {
        Box::pin(PriceStore::upsert_snapshots(self, batch))
    }

    fn prune(&self, older_than: DateTime<Utc>) -> BoxFuture<'_, PersistenceResult<u64>> {
        Box::pin(PriceStore::prune(self, older_than))
    }
}

/// Scheduler state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Fetching,
    Persisting,
    Stopping,
}

impl SchedulerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Persisting => "persisting",
            Self::Stopping => "stopping",
        }
    }
}

#[derive(Debug, Error)]
enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FeedError),

    #[error("persist failed: {0}")]
    Persist(#[from] PersistenceError),
}

/// Outcome of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub fetched: usize,
    pub inserted: u64,
    /// `None` when pruning is disabled or did not run.
    pub pruned: Option<u64>,
    pub error: Option<String>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Totals for one `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub completed: u64,
    pub failed: u64,
}

impl SchedulerStats {
    fn record(&mut self, report: &CycleReport) {
        if report.is_success() {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.completed + self.failed
    }
}

pub type DynSnapshotSource = Arc<dyn SnapshotSource>;
pub type DynSnapshotSink = Arc<dyn SnapshotSink>;

pub struct Scheduler {
    config: TrackingConfig,
    source: DynSnapshotSource,
    sink: DynSnapshotSink,
    state: RwLock<SchedulerState>,
    cycles: AtomicU64,
}

impl Scheduler {
    pub fn new(config: TrackingConfig, source: DynSnapshotSource, sink: DynSnapshotSink) -> Self {
        Self {
            config,
            source,
            sink,
            state: RwLock::new(SchedulerState::Idle),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.read()
    }

    /// Run cycles until `shutdown` is cancelled or `max_cycles` have run.
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval
    /// is followed at once by the next one; missed ticks are not replayed.
    pub async fn run(&self, shutdown: CancellationToken, max_cycles: Option<u64>) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            coins = self.config.coin_ids().len(),
            interval_secs = self.config.poll_interval().as_secs(),
            pruning = self.config.pruning_enabled(),
            "Scheduler started"
        );

        loop {
            if max_cycles.is_some_and(|max| stats.total() >= max) {
                info!(cycles = stats.total(), "Cycle limit reached");
                break;
            }

            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {}
            }

            // Not raced against shutdown: an in-flight cycle always completes.
            let report = self.run_once().await;
            stats.record(&report);
        }

        self.set_state(SchedulerState::Stopping);
        info!(
            completed = stats.completed,
            failed = stats.failed,
            "Scheduler stopped"
        );
        stats
    }

    /// Execute exactly one cycle.
    pub async fn run_once(&self) -> CycleReport {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();
        let mut report = CycleReport {
            cycle,
            fetched: 0,
            inserted: 0,
            pruned: None,
            error: None,
        };

        if let Err(e) = self.execute(&mut report).await {
            match &e {
                CycleError::Fetch(_) => warn!(cycle, error = %e, "Cycle failed"),
                CycleError::Persist(_) => error!(cycle, error = %e, "Cycle failed"),
            }
            report.error = Some(e.to_string());
        }
        self.set_state(SchedulerState::Idle);

        let elapsed = started.elapsed();
        Metrics::cycle_completed(report.is_success(), elapsed.as_secs_f64());
        if report.is_success() {
            info!(
                cycle,
                fetched = report.fetched,
                inserted = report.inserted,
                pruned = ?report.pruned,
                elapsed_ms = elapsed.as_millis() as u64,
                "Cycle complete"
            );
        }
        report
    }

    async fn execute(&self, report: &mut CycleReport) -> Result<(), CycleError> {
        self.set_state(SchedulerState::Fetching);
        let snapshots = self.source.fetch_snapshot(self.config.coin_ids()).await?;
        report.fetched = snapshots.len();
        for snapshot in &snapshots {
            Metrics::snapshot_fetched(snapshot.coin_id());
        }

        self.set_state(SchedulerState::Persisting);
        if snapshots.is_empty() {
            warn!(cycle = report.cycle, "Market data API returned no snapshots");
        } else {
            report.inserted = self.sink.upsert_snapshots(&snapshots).await?;
            Metrics::rows_inserted(report.inserted);
        }

        if let Some(cutoff) = self.config.retention_cutoff(Utc::now()) {
            let pruned = self.sink.prune(cutoff).await?;
            Metrics::rows_pruned(pruned);
            report.pruned = Some(pruned);
        }
        Ok(())
    }

    fn set_state(&self, state: SchedulerState) {
        *self.state.write() = state;
        Metrics::scheduler_state_set(state.as_str());
    }
}

//! Run summary output.
//!
//! Logs per-coin fetch totals and cycle counters collected since startup.
//! The tracker emits it hourly and once more at shutdown.

use crate::metrics::{
    CYCLES_TOTAL, FETCH_RETRIES_TOTAL, ROWS_INSERTED_TOTAL, ROWS_PRUNED_TOTAL,
    SNAPSHOTS_FETCHED_TOTAL,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Totals for one tracked coin.
#[derive(Debug, Clone, Serialize)]
pub struct CoinRunStats {
    pub coin_id: String,
    pub snapshots_fetched: u64,
}

/// Process-wide totals since the reporter was created.
#[derive(Debug, Clone, Serialize)]
pub struct RunTotals {
    pub started_at: DateTime<Utc>,
    pub cycles_succeeded: u64,
    pub cycles_failed: u64,
    pub rows_inserted: u64,
    pub rows_pruned: u64,
    pub fetch_retries: u64,
    pub coins: BTreeMap<String, CoinRunStats>,
}

/// Run summary reporter.
pub struct RunSummary {
    coins: Vec<String>,
    start_time: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(coins: Vec<String>) -> Self {
        Self {
            coins,
            start_time: Utc::now(),
        }
    }

    /// Read current totals from the metric registry.
    pub fn totals(&self) -> RunTotals {
        let coins = self
            .coins
            .iter()
            .map(|coin_id| {
                let stats = CoinRunStats {
                    coin_id: coin_id.clone(),
                    snapshots_fetched: SNAPSHOTS_FETCHED_TOTAL
                        .with_label_values(&[coin_id.as_str()])
                        .get() as u64,
                };
                (coin_id.clone(), stats)
            })
            .collect();

        let fetch_retries = ["network", "rate_limited"]
            .iter()
            .map(|reason| FETCH_RETRIES_TOTAL.with_label_values(&[reason]).get() as u64)
            .sum();

        RunTotals {
            started_at: self.start_time,
            cycles_succeeded: CYCLES_TOTAL.with_label_values(&["success"]).get() as u64,
            cycles_failed: CYCLES_TOTAL.with_label_values(&["failure"]).get() as u64,
            rows_inserted: ROWS_INSERTED_TOTAL.get() as u64,
            rows_pruned: ROWS_PRUNED_TOTAL.get() as u64,
            fetch_retries,
            coins,
        }
    }

    /// Output the summary to logs.
    pub fn output_summary(&self) {
        let totals = self.totals();
        let duration = Utc::now() - self.start_time;
        let hours = duration.num_hours();
        let minutes = duration.num_minutes() % 60;

        info!("========== Run Summary ==========");
        info!(
            "Period: {} ({} hours {} minutes)",
            self.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
            hours,
            minutes
        );
        info!(
            cycles_succeeded = totals.cycles_succeeded,
            cycles_failed = totals.cycles_failed,
            rows_inserted = totals.rows_inserted,
            rows_pruned = totals.rows_pruned,
            fetch_retries = totals.fetch_retries,
            "Ingestion totals"
        );
        for stats in totals.coins.values() {
            info!(
                coin = %stats.coin_id,
                snapshots = stats.snapshots_fetched,
                "Coin totals"
            );
        }
        info!("=================================");
    }
}

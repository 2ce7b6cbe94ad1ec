//! Application wiring: one method per CLI command.
//!
//! Results are written to the given writer as JSON lines.

use crate::cli::Command;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::scheduler::Scheduler;
use chrono::{TimeDelta, Utc};
use coinwatch_analysis::TrendEngine;
use coinwatch_feed::MarketDataClient;
use coinwatch_persistence::{PriceStore, TABLE_NAME};
use coinwatch_telemetry::{run_metrics_server, RunSummary};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run summary output interval (1 hour).
const SUMMARY_INTERVAL: Duration = Duration::from_secs(3600);

/// Main application.
pub struct Application {
    settings: Settings,
}

impl Application {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Execute one CLI command.
    pub async fn execute<W: Write>(&self, command: Command, out: &mut W) -> AppResult<()> {
        match command {
            Command::Collect { once, max_cycles } => self.collect(once, max_cycles, out).await,
            Command::InitDb => {
                let store = self.open_store().await?;
                write_json_line(
                    out,
                    &serde_json::json!({
                        "status": "ok",
                        "backend": store.backend().to_string(),
                        "table": TABLE_NAME,
                    }),
                )?;
                store.close().await;
                Ok(())
            }
            Command::Latest => {
                let store = self.open_store().await?;
                let latest = store.latest_snapshots().await?;
                write_json_lines(out, &latest)?;
                store.close().await;
                Ok(())
            }
            Command::History { coin, days } => {
                let engine = self.engine().await?;
                let rows = engine.price_history(&normalize(&coin), days).await?;
                write_json_lines(out, &rows)
            }
            Command::Rolling { coin, window } => {
                let engine = self.engine().await?;
                let points = engine.rolling_average(&normalize(&coin), window).await?;
                write_json_lines(out, &points)
            }
            Command::Returns { coin } => {
                let engine = self.engine().await?;
                let returns = engine.daily_return(&normalize(&coin)).await?;
                write_json_lines(out, &returns)
            }
            Command::Trend {
                coin,
                lookback,
                threshold,
            } => {
                let engine = self.engine().await?;
                let report = engine
                    .classify_trend(&normalize(&coin), lookback, threshold)
                    .await?;
                write_json_line(out, &report)
            }
            Command::Correlate {
                coin_a,
                coin_b,
                window,
            } => {
                let engine = self.engine().await?;
                let result = engine
                    .correlation(&normalize(&coin_a), &normalize(&coin_b), window)
                    .await?;
                write_json_line(out, &result)
            }
            Command::Prune { older_than_days } => self.prune(older_than_days, out).await,
        }
    }

    /// Connect to the configured database and make sure the table exists.
    pub async fn open_store(&self) -> AppResult<Arc<PriceStore>> {
        let store = PriceStore::connect(&self.settings.database).await?;
        store.ensure_schema().await?;
        Ok(Arc::new(store))
    }

    async fn engine(&self) -> AppResult<TrendEngine> {
        let store = self.open_store().await?;
        Ok(TrendEngine::new(store, self.settings.analysis)?)
    }

    async fn collect<W: Write>(
        &self,
        once: bool,
        max_cycles: Option<u64>,
        out: &mut W,
    ) -> AppResult<()> {
        let store = self.open_store().await?;
        let client = Arc::new(MarketDataClient::new(self.settings.api.clone())?);
        let scheduler = Scheduler::new(self.settings.tracking.clone(), client, store.clone());

        if once {
            let report = scheduler.run_once().await;
            write_json_line(out, &report)?;
            store.close().await;
            return match report.error {
                Some(reason) => Err(AppError::CycleFailed {
                    cycle: report.cycle,
                    reason,
                }),
                None => Ok(()),
            };
        }

        let shutdown = CancellationToken::new();

        let signal_task = {
            let token = shutdown.clone();
            tokio::spawn(async move {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => match result {
                        Ok(()) => {
                            info!("Shutdown signal received");
                            token.cancel();
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to listen for shutdown signal");
                            token.cancelled().await;
                        }
                    },
                    () = token.cancelled() => {}
                }
            })
        };

        let metrics_task = self.settings.metrics_port.map(|port| {
            let token = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = run_metrics_server(port, token).await {
                    warn!(port, error = %e, "Metrics server failed");
                }
            })
        });

        let summary = Arc::new(RunSummary::new(
            self.settings.tracking.coin_ids().iter().cloned().collect(),
        ));
        let summary_task = {
            let summary = summary.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(SUMMARY_INTERVAL);
                interval.tick().await;
                loop {
                    tokio::select! {
                        () = token.cancelled() => break,
                        _ = interval.tick() => {
                            info!("Outputting periodic run summary");
                            summary.output_summary();
                        }
                    }
                }
            })
        };

        let stats = scheduler.run(shutdown.clone(), max_cycles).await;

        shutdown.cancel();
        let _ = signal_task.await;
        let _ = summary_task.await;
        if let Some(task) = metrics_task {
            let _ = task.await;
        }

        info!("Final run summary:");
        summary.output_summary();
        write_json_line(out, &stats)?;
        store.close().await;
        Ok(())
    }

    async fn prune<W: Write>(&self, older_than_days: Option<u32>, out: &mut W) -> AppResult<()> {
        let now = Utc::now();
        let cutoff = match older_than_days {
            Some(0) => {
                return Err(AppError::Config(
                    "--older-than-days must be positive".to_string(),
                ))
            }
            Some(days) => TimeDelta::try_days(i64::from(days))
                .and_then(|span| now.checked_sub_signed(span))
                .ok_or_else(|| {
                    AppError::Config(format!("--older-than-days {days} is out of range"))
                })?,
            None => self.settings.tracking.retention_cutoff(now).ok_or_else(|| {
                AppError::Config(
                    "retention is disabled (tracking.retention_days = 0); pass --older-than-days"
                        .to_string(),
                )
            })?,
        };

        let store = self.open_store().await?;
        let pruned = store.prune(cutoff).await?;
        info!(cutoff = %cutoff, pruned, "Pruned price series");
        write_json_line(
            out,
            &serde_json::json!({ "cutoff": cutoff, "pruned": pruned }),
        )?;
        store.close().await;
        Ok(())
    }
}

fn normalize(coin: &str) -> String {
    coin.trim().to_ascii_lowercase()
}

fn write_json_line<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> AppResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_json_lines<W: Write, T: Serialize>(out: &mut W, values: &[T]) -> AppResult<()> {
    for value in values {
        write_json_line(out, value)?;
    }
    out.flush()?;
    Ok(())
}

//! Read-only analysis engine over the price store.

use crate::correlation::{correlate, Correlation};
use crate::daily::{daily_prices, daily_returns, rolling_average, DailyPrice, DailyReturn, RollingAveragePoint};
use crate::error::{AnalysisError, AnalysisResult};
use crate::trend::{classify, TrendReport};
use chrono::{DateTime, TimeDelta, Utc};
use coinwatch_core::{BoxFuture, CoinSnapshot};
use coinwatch_persistence::{PersistenceResult, PriceStore};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_HISTORY_DAYS: u32 = 365;

/// Largest accepted `history_days` (100 years).
pub const MAX_HISTORY_DAYS: u32 = 36_500;

/// Source of stored snapshots for one coin and time range.
pub trait SeriesReader: Send + Sync {
    /// Rows with `since <= timestamp <= until`, oldest first.
    fn read_range<'a>(
        &'a self,
        coin_id: &'a str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> BoxFuture<'a, PersistenceResult<Vec<CoinSnapshot>>>;
}

pub type DynSeriesReader = Arc<dyn SeriesReader>;

impl SeriesReader for PriceStore {
    fn read_range<'a>(
        &'a self,
        coin_id: &'a str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> BoxFuture<'a, PersistenceResult<Vec<CoinSnapshot>>> {
        Box::pin(self.query_range(coin_id, since, until))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Days of history loaded for every statistic, ending now.
    pub history_days: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

/// Trend analysis over a [`SeriesReader`].
///
/// Never writes and never touches the network; rows inserted while a
/// query runs may or may not be seen.
pub struct TrendEngine {
    reader: DynSeriesReader,
    config: AnalysisConfig,
}

impl TrendEngine {
    pub fn new(reader: DynSeriesReader, config: AnalysisConfig) -> AnalysisResult<Self> {
        if config.history_days == 0 {
            return Err(AnalysisError::InvalidParameter(
                "history_days must be positive".to_string(),
            ));
        }
        if config.history_days > MAX_HISTORY_DAYS {
            return Err(AnalysisError::InvalidParameter(format!(
                "history_days must be at most {MAX_HISTORY_DAYS}"
            )));
        }
        Ok(Self { reader, config })
    }

    /// Raw snapshots of the last `days` days.
    pub async fn price_history(&self, coin_id: &str, days: u32) -> AnalysisResult<Vec<CoinSnapshot>> {
        positive("days", days as usize)?;
        self.load(coin_id, days, Utc::now()).await
    }

    pub async fn rolling_average(
        &self,
        coin_id: &str,
        window_days: usize,
    ) -> AnalysisResult<Vec<RollingAveragePoint>> {
        positive("window_days", window_days)?;
        let days = self.daily(coin_id).await?;
        Ok(rolling_average(&days, window_days))
    }

    pub async fn daily_return(&self, coin_id: &str) -> AnalysisResult<Vec<DailyReturn>> {
        let days = self.daily(coin_id).await?;
        Ok(daily_returns(&days))
    }

    pub async fn classify_trend(
        &self,
        coin_id: &str,
        lookback_days: usize,
        majority_threshold: usize,
    ) -> AnalysisResult<TrendReport> {
        positive("lookback_days", lookback_days)?;
        positive("majority_threshold", majority_threshold)?;
        if majority_threshold > lookback_days {
            return Err(AnalysisError::InvalidParameter(format!(
                "majority_threshold {majority_threshold} exceeds lookback_days {lookback_days}"
            )));
        }
        let days = self.daily(coin_id).await?;
        Ok(classify(coin_id, &days, lookback_days, majority_threshold))
    }

    pub async fn correlation(
        &self,
        coin_id_a: &str,
        coin_id_b: &str,
        window_days: usize,
    ) -> AnalysisResult<Correlation> {
        positive("window_days", window_days)?;
        let a = self.daily(coin_id_a).await?;
        let b = self.daily(coin_id_b).await?;
        let mut result = correlate(&a, &b, window_days)?;
        result.coin_a = coin_id_a.to_string();
        result.coin_b = coin_id_b.to_string();
        Ok(result)
    }

    async fn daily(&self, coin_id: &str) -> AnalysisResult<Vec<DailyPrice>> {
        let snapshots = self
            .load(coin_id, self.config.history_days, Utc::now())
            .await?;
        Ok(daily_prices(&snapshots))
    }

    async fn load(
        &self,
        coin_id: &str,
        days: u32,
        until: DateTime<Utc>,
    ) -> AnalysisResult<Vec<CoinSnapshot>> {
        let since = TimeDelta::try_days(i64::from(days))
            .and_then(|span| until.checked_sub_signed(span))
            .ok_or_else(|| {
                AnalysisError::InvalidParameter(format!("{days} days of history is out of range"))
            })?;
        let rows = self.reader.read_range(coin_id, since, until).await?;
        debug!(coin = %coin_id, rows = rows.len(), days, "Loaded price history");
        Ok(rows)
    }
}

fn positive(name: &str, value: usize) -> AnalysisResult<()> {
    if value == 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "{name} must be positive"
        )));
    }
    Ok(())
}

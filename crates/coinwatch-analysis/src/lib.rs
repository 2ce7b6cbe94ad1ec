//! Trend analysis over the stored price series.
//!
//! Statistics are computed in memory from `query_range` rows so every
//! backend behaves the same:
//! - Daily prices (first sample of each UTC day)
//! - Rolling averages and daily returns
//! - Bullish/bearish trend classification
//! - Pearson correlation between two coins

pub mod correlation;
pub mod daily;
pub mod engine;
pub mod error;
pub mod trend;

pub use correlation::{correlate, pearson, Correlation, DEFAULT_CORRELATION_WINDOW_DAYS};
pub use daily::{
    daily_prices, daily_returns, rolling_average, DailyPrice, DailyReturn, RollingAveragePoint,
    DEFAULT_ROLLING_WINDOW_DAYS,
};
pub use engine::{
    AnalysisConfig, DynSeriesReader, SeriesReader, TrendEngine, DEFAULT_HISTORY_DAYS,
    MAX_HISTORY_DAYS,
};
pub use error::{AnalysisError, AnalysisResult};
pub use trend::{
    classify, Direction, TrendLabel, TrendPoint, TrendReport, DEFAULT_LOOKBACK_DAYS,
    DEFAULT_MAJORITY_THRESHOLD,
};

//! Bullish/bearish trend classification.

use crate::daily::{return_between, DailyPrice};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Default trailing window for classification.
pub const DEFAULT_LOOKBACK_DAYS: usize = 7;
/// Default number of same-direction days that makes a trend.
pub const DEFAULT_MAJORITY_THRESHOLD: usize = 4;

/// Sign of a day's return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Unchanged,
}

impl Direction {
    fn from_return(return_pct: f64) -> Self {
        if return_pct > 0.0 {
            Self::Up
        } else if return_pct < 0.0 {
            Self::Down
        } else {
            Self::Unchanged
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Classification of one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub coin_id: String,
    pub date: NaiveDate,
    pub price: f64,
    /// `None` for the first day and after a zero price.
    pub daily_return_pct: Option<f64>,
    pub direction: Option<Direction>,
    /// Mean price over the trailing lookback rows.
    pub rolling_average: f64,
    pub above_average: bool,
    pub trend: TrendLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub coin_id: String,
    /// Label of the most recent day.
    pub label: TrendLabel,
    pub points: Vec<TrendPoint>,
}

/// Classify every day over its trailing `lookback_days` rows.
///
/// A day is bullish when at least `threshold` rows in its window went up,
/// bearish when at least `threshold` went down, neutral otherwise. Callers
/// validate that `lookback_days` and `threshold` are non-zero.
pub fn classify(
    coin_id: &str,
    days: &[DailyPrice],
    lookback_days: usize,
    threshold: usize,
) -> TrendReport {
    let lookback_days = lookback_days.max(1);

    let returns: Vec<Option<f64>> = days
        .iter()
        .enumerate()
        .map(|(i, day)| {
            i.checked_sub(1)
                .and_then(|prev| return_between(days[prev].price, day.price))
        })
        .collect();
    let directions: Vec<Option<Direction>> = returns
        .iter()
        .map(|r| r.map(Direction::from_return))
        .collect();

    let points: Vec<TrendPoint> = days
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let start = (i + 1).saturating_sub(lookback_days);
            let window = &directions[start..=i];
            let ups = window.iter().filter(|d| **d == Some(Direction::Up)).count();
            let downs = window.iter().filter(|d| **d == Some(Direction::Down)).count();
            let trend = if ups >= threshold {
                TrendLabel::Bullish
            } else if downs >= threshold {
                TrendLabel::Bearish
            } else {
                TrendLabel::Neutral
            };

            let prices = &days[start..=i];
            let rolling_average =
                prices.iter().map(|d| d.price).sum::<f64>() / prices.len() as f64;

            TrendPoint {
                coin_id: day.coin_id.clone(),
                date: day.date,
                price: day.price,
                daily_return_pct: returns[i],
                direction: directions[i],
                rolling_average,
                above_average: day.price > rolling_average,
                trend,
            }
        })
        .collect();

    let label = if returns.iter().any(Option::is_some) {
        points.last().map_or(TrendLabel::Neutral, |p| p.trend)
    } else {
        TrendLabel::Neutral
    };

    TrendReport {
        coin_id: coin_id.to_string(),
        label,
        points,
    }
}

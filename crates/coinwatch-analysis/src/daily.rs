//! Daily price series, rolling averages and daily returns.

use chrono::NaiveDate;
use coinwatch_core::CoinSnapshot;
use serde::Serialize;

/// Default rolling-average window, in daily rows.
pub const DEFAULT_ROLLING_WINDOW_DAYS: usize = 7;

/// One price per UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPrice {
    pub coin_id: String,
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingAveragePoint {
    pub coin_id: String,
    pub date: NaiveDate,
    pub price: f64,
    pub rolling_average: f64,
    /// Days that went into the average (less than the window at the start).
    pub window_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReturn {
    pub coin_id: String,
    pub date: NaiveDate,
    pub price: f64,
    pub previous_price: f64,
    pub return_pct: f64,
}

/// Reduce snapshots to the first sample of each UTC day, oldest day first.
pub fn daily_prices(snapshots: &[CoinSnapshot]) -> Vec<DailyPrice> {
    let mut ordered: Vec<&CoinSnapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.timestamp());

    let mut days: Vec<DailyPrice> = Vec::new();
    for snap in ordered {
        let date = snap.calendar_date();
        if days.last().is_some_and(|d| d.date == date) {
            continue;
        }
        days.push(DailyPrice {
            coin_id: snap.coin_id().to_string(),
            date,
            price: snap.price_usd(),
        });
    }
    days
}

/// Trailing mean over the last `window_days` daily rows, including the current one.
///
/// Missing calendar days are not filled; the window counts stored days.
pub fn rolling_average(days: &[DailyPrice], window_days: usize) -> Vec<RollingAveragePoint> {
    let window_days = window_days.max(1);
    days.iter()
        .enumerate()
        .map(|(i, day)| {
            let start = (i + 1).saturating_sub(window_days);
            let window = &days[start..=i];
            let sum: f64 = window.iter().map(|d| d.price).sum();
            RollingAveragePoint {
                coin_id: day.coin_id.clone(),
                date: day.date,
                price: day.price,
                rolling_average: sum / window.len() as f64,
                window_len: window.len(),
            }
        })
        .collect()
}

/// Percent change versus the previous stored day, or `None` when the
/// previous price is zero.
pub(crate) fn return_between(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// Day-over-day percent changes. The first day has no return and is skipped.
pub fn daily_returns(days: &[DailyPrice]) -> Vec<DailyReturn> {
    days.windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            return_between(prev.price, cur.price).map(|return_pct| DailyReturn {
                coin_id: cur.coin_id.clone(),
                date: cur.date,
                price: cur.price,
                previous_price: prev.price,
                return_pct,
            })
        })
        .collect()
}

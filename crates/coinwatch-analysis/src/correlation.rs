//! Pearson correlation between two daily price series.

use crate::daily::DailyPrice;
use crate::error::{AnalysisError, AnalysisResult};
use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;
use std::collections::BTreeMap;

/// Points required for a correlation.
pub const MIN_POINTS: usize = 2;

pub const DEFAULT_CORRELATION_WINDOW_DAYS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub coin_a: String,
    pub coin_b: String,
    pub coefficient: f64,
    /// Overlapping dates used.
    pub points: usize,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Pearson coefficient of two equal-length samples.
///
/// Returns `None` for fewer than two points or when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < MIN_POINTS {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Correlate two series over the last `window_days` calendar days.
///
/// The window ends at the newest date of either series; only dates present
/// in both series inside that window are used.
pub fn correlate(
    a: &[DailyPrice],
    b: &[DailyPrice],
    window_days: usize,
) -> AnalysisResult<Correlation> {
    if window_days == 0 {
        return Err(AnalysisError::InvalidParameter(
            "window_days must be positive".to_string(),
        ));
    }
    let coin_a = a.first().map(|d| d.coin_id.clone()).unwrap_or_default();
    let coin_b = b.first().map(|d| d.coin_id.clone()).unwrap_or_default();

    let newest = a.iter().chain(b).map(|d| d.date).max();
    let window_start = newest.and_then(|end| {
        let span = i64::try_from(window_days - 1).ok()?;
        end.checked_sub_signed(TimeDelta::try_days(span)?)
    });

    let prices_b: BTreeMap<NaiveDate, f64> = b.iter().map(|d| (d.date, d.price)).collect();
    let recent: Vec<(NaiveDate, (f64, f64))> = a
        .iter()
        .filter(|d| window_start.map_or(true, |start| d.date >= start))
        .filter_map(|d| prices_b.get(&d.date).map(|pb| (d.date, (d.price, *pb))))
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect();

    if recent.len() < MIN_POINTS {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_POINTS,
            available: recent.len(),
        });
    }

    let xs: Vec<f64> = recent.iter().map(|(_, (x, _))| *x).collect();
    let ys: Vec<f64> = recent.iter().map(|(_, (_, y))| *y).collect();
    let coefficient = pearson(&xs, &ys).ok_or_else(|| {
        AnalysisError::Undefined(format!(
            "{coin_a}/{coin_b}: constant price over the window"
        ))
    })?;

    Ok(Correlation {
        coin_a,
        coin_b,
        coefficient,
        points: recent.len(),
        from: recent[0].0,
        to: recent[recent.len() - 1].0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::tests::day_series;

    #[test]
    fn test_perfect_positive_and_negative() {
        let a = day_series("a", &[1.0, 2.0, 3.0, 4.0]);
        let b = day_series("b", &[10.0, 20.0, 30.0, 40.0]);
        let c = day_series("c", &[4.0, 3.0, 2.0, 1.0]);

        let ab = correlate(&a, &b, 30).unwrap();
        assert!((ab.coefficient - 1.0).abs() < 1e-12);
        assert_eq!(ab.points, 4);
        assert_eq!(ab.coin_a, "a");

        let ac = correlate(&a, &c, 30).unwrap();
        assert!((ac.coefficient + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_one_overlapping_date_is_insufficient() {
        let a = day_series("a", &[1.0]);
        let b = day_series("b", &[5.0, 6.0, 7.0]);
        match correlate(&a, &b, 30) {
            Err(AnalysisError::InsufficientData { needed, available }) => {
                assert_eq!(needed, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_window_uses_most_recent_dates() {
        let a = day_series("a", &[5.0, 1.0, 2.0, 3.0]);
        let b = day_series("b", &[1.0, 1.0, 2.0, 3.0]);
        let corr = correlate(&a, &b, 3).unwrap();
        assert_eq!(corr.points, 3);
        assert_eq!(corr.from, a[1].date);
        assert_eq!(corr.to, a[3].date);
        assert!((corr.coefficient - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_stale_overlap_outside_window_is_insufficient() {
        // `a` keeps trading 200 days after `b` stopped.
        let mut a = day_series("a", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let later: Vec<DailyPrice> = day_series("a", &[6.0, 7.0, 8.0, 9.0, 10.0])
            .into_iter()
            .map(|mut d| {
                d.date = d.date + TimeDelta::days(200);
                d
            })
            .collect();
        a.extend(later);
        let b = day_series("b", &[1.0, 2.0, 3.0, 4.0, 5.0]);

        match correlate(&a, &b, 30) {
            Err(AnalysisError::InsufficientData { available, .. }) => assert_eq!(available, 0),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(correlate(&a, &b, 365).unwrap().points, 5);
    }

    #[test]
    fn test_zero_variance_is_undefined() {
        let a = day_series("a", &[1.0, 1.0, 1.0]);
        let b = day_series("b", &[1.0, 2.0, 3.0]);
        assert!(matches!(correlate(&a, &b, 30), Err(AnalysisError::Undefined(_))));
    }

    #[test]
    fn test_zero_window_rejected() {
        let a = day_series("a", &[1.0, 2.0]);
        assert!(matches!(
            correlate(&a, &a, 0),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }
}

//! Row mapping and timestamp text encoding.
//!
//! Timestamps travel as naive UTC text with six fractional digits so the
//! same binding works on every backend.

use crate::error::{PersistenceError, PersistenceResult};
use crate::queries::TS_ALIAS;
use chrono::{DateTime, NaiveDateTime, Utc};
use coinwatch_core::CoinSnapshot;
use sqlx::any::AnyRow;
use sqlx::Row;

const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format(WRITE_FORMAT).to_string()
}

pub(crate) fn decode_timestamp(raw: &str) -> PersistenceResult<DateTime<Utc>> {
    // Some drivers render a `T` separator or a zone suffix.
    let cleaned = raw.trim().replacen('T', " ", 1);
    let cleaned = cleaned
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim_end_matches("+00");
    NaiveDateTime::parse_from_str(cleaned, READ_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| PersistenceError::Decode(format!("invalid timestamp {raw:?}: {e}")))
}

pub(crate) fn snapshot_from_row(row: &AnyRow) -> PersistenceResult<CoinSnapshot> {
    let coin_id: String = row.try_get("coin_id")?;
    let coin_name: String = row.try_get("coin_name")?;
    let price_usd: f64 = row.try_get("price_usd")?;
    let market_cap: f64 = row.try_get("market_cap")?;
    let volume_24h: Option<f64> = row.try_get("volume_24h")?;
    let change: Option<f64> = row.try_get("price_change_percentage_24h")?;
    let raw_ts: String = row.try_get(TS_ALIAS)?;

    let snapshot = CoinSnapshot::new(
        coin_id,
        coin_name,
        price_usd,
        market_cap,
        decode_timestamp(&raw_ts)?,
    )
    .map_err(|e| PersistenceError::Decode(e.to_string()))?
    .with_volume_24h(volume_24h)
    .with_price_change_pct_24h(change);
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encode_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
        assert_eq!(encode_timestamp(ts), "2024-03-01 09:05:00.000000");
    }

    #[test]
    fn test_decode_variants() {
        let expected = Utc.timestamp_opt(1_709_285_400, 123_000_000).unwrap();
        assert_eq!(decode_timestamp("2024-03-01 09:30:00.123").unwrap(), expected);
        assert_eq!(decode_timestamp("2024-03-01 09:30:00.123000").unwrap(), expected);
        assert_eq!(decode_timestamp("2024-03-01T09:30:00.123Z").unwrap(), expected);
        assert_eq!(
            decode_timestamp("2024-03-01 09:30:00").unwrap(),
            Utc.timestamp_opt(1_709_285_400, 0).unwrap()
        );
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_timestamp("yesterday"),
            Err(PersistenceError::Decode(_))
        ));
    }
}

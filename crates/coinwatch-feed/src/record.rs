//! Raw `/coins/markets` record and its conversion to `CoinSnapshot`.

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use coinwatch_core::CoinSnapshot;
use serde::{Deserialize, Deserializer};

/// One entry of the markets array.
///
/// `price_change_percentage_24h` must be present but may be `null`;
/// `total_volume` may be absent altogether.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketRecord {
    pub id: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    #[serde(deserialize_with = "nullable")]
    pub price_change_percentage_24h: Option<f64>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub total_volume: Option<f64>,
}

/// Required key whose value may be null.
fn nullable<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)
}

impl MarketRecord {
    pub fn into_snapshot(self) -> FeedResult<CoinSnapshot> {
        let snapshot = CoinSnapshot::new(
            self.id,
            self.name,
            self.current_price,
            self.market_cap,
            self.last_updated,
        )
        .map_err(|e| FeedError::Parse(e.to_string()))?
        .with_volume_24h(self.total_volume)
        .with_price_change_pct_24h(self.price_change_percentage_24h);
        Ok(snapshot)
    }
}

/// Parse a markets response body.
///
/// Any record that fails to parse fails the whole batch.
pub fn parse_markets(body: &str) -> FeedResult<Vec<MarketRecord>> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FeedError::Parse(format!("Failed to parse markets response: {e}")))?;

    let entries = value
        .as_array()
        .ok_or_else(|| FeedError::Parse("markets response is not an array".to_string()))?;

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            MarketRecord::deserialize(entry)
                .map_err(|e| FeedError::Parse(format!("Failed to parse market record {idx}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BTC: &str = r#"{
        "id": "bitcoin",
        "name": "Bitcoin",
        "current_price": 62000.5,
        "market_cap": 1220000000000,
        "total_volume": 34000000000,
        "price_change_percentage_24h": -1.25,
        "last_updated": "2024-03-01T12:30:00.123Z"
    }"#;

    #[test]
    fn test_parse_full_record() {
        let records = parse_markets(&format!("[{BTC}]")).unwrap();
        assert_eq!(records.len(), 1);

        let snap = records[0].clone().into_snapshot().unwrap();
        assert_eq!(snap.coin_id(), "bitcoin");
        assert_eq!(snap.price_usd(), 62000.5);
        assert_eq!(snap.volume_24h(), Some(34_000_000_000.0));
        assert_eq!(snap.price_change_pct_24h(), Some(-1.25));
        assert_eq!(snap.timestamp().timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_null_change_and_missing_volume() {
        let body = r#"[{
            "id": "dogecoin", "name": "Dogecoin", "current_price": 0.15,
            "market_cap": 21000000000, "price_change_percentage_24h": null,
            "last_updated": "2024-03-01T12:30:00Z"
        }]"#;
        let snap = parse_markets(body).unwrap().remove(0).into_snapshot().unwrap();
        assert_eq!(snap.price_change_pct_24h(), None);
        assert_eq!(snap.volume_24h(), None);
    }

    #[test]
    fn test_missing_change_key_is_error() {
        let body = r#"[{
            "id": "dogecoin", "name": "Dogecoin", "current_price": 0.15,
            "market_cap": 21000000000, "last_updated": "2024-03-01T12:30:00Z"
        }]"#;
        assert!(matches!(parse_markets(body), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_one_bad_record_fails_batch() {
        let bad = r#"{"id": "ethereum", "name": "Ethereum", "market_cap": 1,
            "price_change_percentage_24h": 1.0, "last_updated": "2024-03-01T12:30:00Z"}"#;
        let err = parse_markets(&format!("[{BTC}, {bad}]")).unwrap_err();
        match err {
            FeedError::Parse(msg) => assert!(msg.contains("record 1"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_array_body() {
        assert!(matches!(
            parse_markets(r#"{"status": "ok"}"#),
            Err(FeedError::Parse(_))
        ));
    }
}

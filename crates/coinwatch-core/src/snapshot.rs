//! Price snapshot type.
//!
//! A `CoinSnapshot` is produced once per coin per fetch and never mutated
//! afterwards. Fields are private; the only way to obtain one is through
//! the validating constructor.

use crate::error::{CoreError, Result};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Sub-second digits kept on snapshot timestamps.
///
/// Microseconds are the finest precision shared by every supported backend,
/// so truncating here keeps the natural key stable across a write/read cycle.
pub const TIMESTAMP_PRECISION_DIGITS: u16 = 6;

/// One fetched price observation for one coin at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    coin_id: String,
    coin_name: String,
    price_usd: f64,
    market_cap: f64,
    volume_24h: Option<f64>,
    price_change_pct_24h: Option<f64>,
    timestamp: DateTime<Utc>,
}

impl CoinSnapshot {
    /// Create a snapshot.
    ///
    /// Rejects empty identifiers and non-finite or negative prices.
    pub fn new(
        coin_id: impl Into<String>,
        coin_name: impl Into<String>,
        price_usd: f64,
        market_cap: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let coin_id = coin_id.into();
        if coin_id.trim().is_empty() {
            return Err(CoreError::InvalidSnapshot("empty coin_id".to_string()));
        }
        if !price_usd.is_finite() || price_usd < 0.0 {
            return Err(CoreError::InvalidSnapshot(format!(
                "{coin_id}: invalid price_usd {price_usd}"
            )));
        }
        if !market_cap.is_finite() || market_cap < 0.0 {
            return Err(CoreError::InvalidSnapshot(format!(
                "{coin_id}: invalid market_cap {market_cap}"
            )));
        }

        Ok(Self {
            coin_id,
            coin_name: coin_name.into(),
            price_usd,
            market_cap,
            volume_24h: None,
            price_change_pct_24h: None,
            timestamp: timestamp.trunc_subsecs(TIMESTAMP_PRECISION_DIGITS),
        })
    }

    /// Attach the 24h traded volume.
    #[must_use]
    pub fn with_volume_24h(mut self, volume_24h: Option<f64>) -> Self {
        self.volume_24h = volume_24h.filter(|v| v.is_finite());
        self
    }

    /// Attach the 24h price change percentage.
    #[must_use]
    pub fn with_price_change_pct_24h(mut self, pct: Option<f64>) -> Self {
        self.price_change_pct_24h = pct.filter(|v| v.is_finite());
        self
    }

    pub fn coin_id(&self) -> &str {
        &self.coin_id
    }

    pub fn coin_name(&self) -> &str {
        &self.coin_name
    }

    pub fn price_usd(&self) -> f64 {
        self.price_usd
    }

    pub fn market_cap(&self) -> f64 {
        self.market_cap
    }

    pub fn volume_24h(&self) -> Option<f64> {
        self.volume_24h
    }

    pub fn price_change_pct_24h(&self) -> Option<f64> {
        self.price_change_pct_24h
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// UTC calendar date of this observation.
    pub fn calendar_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

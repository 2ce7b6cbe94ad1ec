//! Ingestion settings shared by the scheduler, client and store.

use crate::error::{CoreError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeSet;
use std::time::Duration;

/// Immutable ingestion settings.
///
/// Built once at startup and passed by reference; there is no way to
/// change a `TrackingConfig` after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfig {
    coin_ids: BTreeSet<String>,
    poll_interval: Duration,
    retention_horizon: Duration,
    api_timeout: Duration,
}

impl TrackingConfig {
    /// Create a validated tracking config.
    ///
    /// A zero `retention_horizon` disables pruning.
    pub fn new(
        coin_ids: BTreeSet<String>,
        poll_interval: Duration,
        retention_horizon: Duration,
        api_timeout: Duration,
    ) -> Result<Self> {
        if coin_ids.is_empty() {
            return Err(CoreError::InvalidConfig(
                "at least one coin must be tracked".to_string(),
            ));
        }
        if let Some(bad) = coin_ids.iter().find(|id| id.trim().is_empty()) {
            return Err(CoreError::InvalidConfig(format!("blank coin id: {bad:?}")));
        }
        if poll_interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "poll interval must be positive".to_string(),
            ));
        }
        if api_timeout.is_zero() {
            return Err(CoreError::InvalidConfig(
                "API timeout must be positive".to_string(),
            ));
        }
        if TimeDelta::from_std(retention_horizon).is_err() {
            return Err(CoreError::InvalidConfig(format!(
                "retention horizon out of range: {retention_horizon:?}"
            )));
        }

        Ok(Self {
            coin_ids,
            poll_interval,
            retention_horizon,
            api_timeout,
        })
    }

    pub fn coin_ids(&self) -> &BTreeSet<String> {
        &self.coin_ids
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn retention_horizon(&self) -> Duration {
        self.retention_horizon
    }

    pub fn api_timeout(&self) -> Duration {
        self.api_timeout
    }

    /// Whether retention pruning runs after each cycle.
    pub fn pruning_enabled(&self) -> bool {
        !self.retention_horizon.is_zero()
    }

    /// Cutoff for pruning relative to `now`, or `None` when pruning is disabled.
    pub fn retention_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.pruning_enabled() {
            return None;
        }
        let horizon = TimeDelta::from_std(self.retention_horizon).ok()?;
        now.checked_sub_signed(horizon)
    }
}

/// Parse a comma-separated coin list.
///
/// Entries are trimmed and lowercased; blanks and duplicates are dropped.
pub fn parse_coin_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn coins(list: &str) -> BTreeSet<String> {
        parse_coin_list(list)
    }

    #[test]
    fn test_parse_coin_list_trims_and_dedups() {
        let parsed = parse_coin_list(" bitcoin, Ethereum,,bitcoin , solana");
        let expected: Vec<_> = vec!["bitcoin", "ethereum", "solana"];
        assert_eq!(parsed.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_coin_list(" , ,").is_empty());
    }

    #[test]
    fn test_rejects_empty_coins() {
        let err = TrackingConfig::new(
            BTreeSet::new(),
            Duration::from_secs(60),
            Duration::ZERO,
            Duration::from_secs(10),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = TrackingConfig::new(
            coins("bitcoin"),
            Duration::ZERO,
            Duration::ZERO,
            Duration::from_secs(10),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_retention_cutoff() {
        let cfg = TrackingConfig::new(
            coins("bitcoin"),
            Duration::from_secs(3600),
            Duration::from_secs(7 * 86_400),
            Duration::from_secs(10),
        )
        .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 8, 0, 0, 0).unwrap();
        assert!(cfg.pruning_enabled());
        assert_eq!(
            cfg.retention_cutoff(now),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_zero_retention_disables_pruning() {
        let cfg = TrackingConfig::new(
            coins("bitcoin"),
            Duration::from_secs(3600),
            Duration::ZERO,
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(!cfg.pruning_enabled());
        assert_eq!(cfg.retention_cutoff(Utc::now()), None);
    }
}

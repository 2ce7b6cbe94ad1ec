//! HTTP client for the CoinGecko markets endpoint.

use crate::error::{FeedError, FeedResult};
use crate::record::parse_markets;
use crate::retry::RetryPolicy;
use coinwatch_core::CoinSnapshot;
use coinwatch_telemetry::Metrics;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Maximum ids per request (the endpoint's page size limit).
const MAX_IDS_PER_REQUEST: usize = 250;

/// Market data client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub key_header: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            key_header: DEFAULT_KEY_HEADER.to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("key_header", &self.key_header)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Client for batch price snapshots.
pub struct MarketDataClient {
    client: Client,
    markets_url: String,
    config: ClientConfig,
}

impl MarketDataClient {
    pub fn new(config: ClientConfig) -> FeedResult<Self> {
        if config.timeout.is_zero() {
            return Err(FeedError::HttpClient(
                "request timeout must be positive".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let markets_url = format!("{}/coins/markets", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            markets_url,
            config,
        })
    }

    /// Fetch the current snapshot for every requested coin.
    ///
    /// Ids the API does not recognize are omitted from the result.
    pub async fn fetch_snapshot(&self, coin_ids: &BTreeSet<String>) -> FeedResult<Vec<CoinSnapshot>> {
        if coin_ids.is_empty() {
            return Err(FeedError::InvalidRequest(
                "at least one coin id is required".to_string(),
            ));
        }

        let ids: Vec<&str> = coin_ids.iter().map(String::as_str).collect();
        let mut snapshots = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let body = self.fetch_with_retry(&chunk.join(",")).await?;
            for record in parse_markets(&body)? {
                if !coin_ids.contains(&record.id) {
                    debug!(coin = %record.id, "Dropping record for coin that was not requested");
                    continue;
                }
                snapshots.push(record.into_snapshot()?);
            }
        }

        if snapshots.len() < coin_ids.len() {
            for id in coin_ids {
                if !snapshots.iter().any(|s| s.coin_id() == id) {
                    debug!(coin = %id, "Coin not recognized by market data API");
                }
            }
        }

        info!(
            requested = coin_ids.len(),
            received = snapshots.len(),
            "Fetched market snapshot"
        );

        Ok(snapshots)
    }

    async fn fetch_with_retry(&self, ids: &str) -> FeedResult<String> {
        let policy = &self.config.retry;
        let mut attempt: u32 = 1;

        loop {
            match self.request_markets(ids).await {
                Ok(body) => return Ok(body),
                Err(e) if policy.should_retry(attempt, &e) => {
                    let delay = policy.delay_for(attempt, &e);
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Market data request failed, retrying"
                    );
                    Metrics::fetch_retry(e.kind());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_markets(&self, ids: &str) -> FeedResult<String> {
        let per_page = MAX_IDS_PER_REQUEST.to_string();
        let mut request = self.client.get(&self.markets_url).query(&[
            ("vs_currency", "usd"),
            ("ids", ids),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", "1"),
            ("sparkline", "false"),
            ("price_change_percentage", "24h"),
        ]);
        if let Some(key) = &self.config.api_key {
            request = request.header(self.config.key_header.as_str(), key.as_str());
        }

        let response = request.send().await.map_err(map_send_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(FeedError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| FeedError::Network(format!("Failed to read response body: {e}")))
    }
}

fn map_send_error(e: reqwest::Error) -> FeedError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        FeedError::Network(format!("HTTP request failed: {e}"))
    } else {
        FeedError::HttpClient(format!("HTTP request failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markets_url_trims_slash() {
        let client = MarketDataClient::new(ClientConfig {
            base_url: "http://localhost:9000/api/v3/".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.markets_url, "http://localhost:9000/api/v3/coins/markets");
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ClientConfig {
            api_key: Some("secret-key".to_string()),
            ..ClientConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let client = MarketDataClient::new(ClientConfig::default()).unwrap();
        let err = client.fetch_snapshot(&BTreeSet::new()).await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidRequest(_)));
    }
}

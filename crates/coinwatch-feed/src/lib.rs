//! Market data client for coinwatch.
//!
//! Fetches a batch price snapshot for the tracked coins from the
//! CoinGecko `/coins/markets` endpoint:
//! - One request per cycle for every tracked coin
//! - Exponential backoff for network failures and rate limiting
//! - Strict record validation (a malformed record fails the whole fetch)

pub mod client;
pub mod error;
pub mod record;
pub mod retry;

pub use client::{ClientConfig, MarketDataClient, DEFAULT_BASE_URL, DEFAULT_KEY_HEADER};
pub use error::{FeedError, FeedResult};
pub use record::MarketRecord;
pub use retry::RetryPolicy;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any HTTPS or TLS database connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

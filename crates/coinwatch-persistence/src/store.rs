//! Price series store.

use crate::error::{PersistenceError, PersistenceResult};
use crate::queries::SeriesQueries;
use crate::row::{encode_timestamp, snapshot_from_row};
use crate::settings::{Backend, DatabaseSettings};
use crate::TABLE_NAME;
use chrono::{DateTime, Utc};
use coinwatch_core::CoinSnapshot;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use sqlx::Row;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Dialect-aware store for the `crypto_prices` series.
///
/// Holds a single pooled connection. Every operation is bounded by the
/// configured operation timeout; exceeding it is a connection error.
pub struct PriceStore {
    pool: AnyPool,
    backend: Backend,
    queries: SeriesQueries,
    op_timeout: Duration,
}

impl PriceStore {
    /// Open a connection to the configured database.
    pub async fn connect(settings: &DatabaseSettings) -> PersistenceResult<Self> {
        sqlx::any::install_default_drivers();

        if settings.op_timeout.is_zero() {
            return Err(PersistenceError::InvalidSettings(
                "operation timeout must be positive".to_string(),
            ));
        }
        let url = settings.connection_url()?;

        // One long-lived connection; an in-memory SQLite database lives
        // exactly as long as it does.
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(settings.op_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(&url)
            .await
            .map_err(|e| match PersistenceError::from(e) {
                PersistenceError::Query(msg) => PersistenceError::Connection(msg),
                other => other,
            })?;

        let backend = settings.backend;
        info!(
            backend = %backend,
            database = %settings.name,
            "Connected to price store"
        );

        Ok(Self {
            pool,
            backend,
            queries: SeriesQueries::new(backend.dialect(), TABLE_NAME),
            op_timeout: settings.op_timeout,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Create the series table and its unique key if absent.
    pub async fn ensure_schema(&self) -> PersistenceResult<()> {
        self.timed("ensure_schema", async {
            sqlx::query(&self.queries.create_table)
                .execute(&self.pool)
                .await
                .map_err(|e| match PersistenceError::from(e) {
                    PersistenceError::Connection(msg) => PersistenceError::Connection(msg),
                    other => PersistenceError::Schema(other.to_string()),
                })?;
            Ok::<_, PersistenceError>(())
        })
        .await?;
        info!(table = TABLE_NAME, backend = %self.backend, "Schema ready");
        Ok(())
    }

    /// Insert snapshots, skipping rows whose (coin_id, timestamp) already exists.
    ///
    /// The batch is written in one transaction. Returns the number of new rows.
    pub async fn upsert_snapshots(&self, batch: &[CoinSnapshot]) -> PersistenceResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let inserted = self
            .timed("upsert_snapshots", async {
                let mut tx = self.pool.begin().await?;
                let mut inserted = 0u64;
                for snapshot in batch {
                    let result = sqlx::query(&self.queries.insert)
                        .bind(snapshot.coin_id())
                        .bind(snapshot.coin_name())
                        .bind(snapshot.price_usd())
                        .bind(snapshot.market_cap())
                        .bind(snapshot.volume_24h())
                        .bind(snapshot.price_change_pct_24h())
                        .bind(encode_timestamp(snapshot.timestamp()))
                        .execute(&mut *tx)
                        .await?;
                    inserted += result.rows_affected();
                }
                tx.commit().await?;
                Ok::<_, PersistenceError>(inserted)
            })
            .await?;

        debug!(
            batch = batch.len(),
            inserted,
            skipped = batch.len() as u64 - inserted.min(batch.len() as u64),
            "Upserted snapshots"
        );
        Ok(inserted)
    }

    /// Rows for `coin_id` with `since <= timestamp <= until`, oldest first.
    pub async fn query_range(
        &self,
        coin_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> PersistenceResult<Vec<CoinSnapshot>> {
        if since > until {
            return Ok(Vec::new());
        }
        self.timed("query_range", async {
            let rows = sqlx::query(&self.queries.select_range)
                .bind(coin_id)
                .bind(encode_timestamp(since))
                .bind(encode_timestamp(until))
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(snapshot_from_row)
                .collect::<PersistenceResult<Vec<_>>>()
        })
        .await
    }

    /// Delete rows strictly older than `older_than`. Returns rows removed.
    pub async fn prune(&self, older_than: DateTime<Utc>) -> PersistenceResult<u64> {
        let removed = self
            .timed("prune", async {
                let result = sqlx::query(&self.queries.delete_before)
                    .bind(encode_timestamp(older_than))
                    .execute(&self.pool)
                    .await?;
                Ok::<_, PersistenceError>(result.rows_affected())
            })
            .await?;
        debug!(cutoff = %older_than, removed, "Pruned price series");
        Ok(removed)
    }

    /// Most recent row per coin, largest market cap first.
    pub async fn latest_snapshots(&self) -> PersistenceResult<Vec<CoinSnapshot>> {
        self.timed("latest_snapshots", async {
            let rows = sqlx::query(&self.queries.select_latest)
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(snapshot_from_row)
                .collect::<PersistenceResult<Vec<_>>>()
        })
        .await
    }

    /// Stored row count, optionally for one coin.
    pub async fn row_count(&self, coin_id: Option<&str>) -> PersistenceResult<u64> {
        self.timed("row_count", async {
            let row = match coin_id {
                Some(coin) => {
                    sqlx::query(&self.queries.count_coin)
                        .bind(coin)
                        .fetch_one(&self.pool)
                        .await?
                }
                None => {
                    sqlx::query(&self.queries.count_all)
                        .fetch_one(&self.pool)
                        .await?
                }
            };
            let n: i64 = row.try_get("n")?;
            Ok::<_, PersistenceError>(u64::try_from(n).unwrap_or(0))
        })
        .await
    }

    /// Close the pool, waiting for the connection to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn timed<T, F>(&self, op: &'static str, fut: F) -> PersistenceResult<T>
    where
        F: Future<Output = PersistenceResult<T>>,
    {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| {
                PersistenceError::Connection(format!(
                    "{op} timed out after {}ms",
                    self.op_timeout.as_millis()
                ))
            })?
    }
}

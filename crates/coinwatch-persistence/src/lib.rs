//! Price series persistence for coinwatch.
//!
//! Stores `CoinSnapshot` rows in a `crypto_prices` table on PostgreSQL,
//! MySQL or SQLite through the sqlx `Any` driver. Dialect differences live
//! in [`dialect`]; statements are built once per store in [`queries`].

pub mod dialect;
pub mod error;
pub mod queries;
mod row;
pub mod settings;
pub mod store;

pub use dialect::SqlDialect;
pub use error::{PersistenceError, PersistenceResult};
pub use settings::{Backend, DatabaseSettings};
pub use store::PriceStore;

/// Name of the price series table.
pub const TABLE_NAME: &str = "crypto_prices";

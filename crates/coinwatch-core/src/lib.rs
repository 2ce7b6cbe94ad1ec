//! Core domain types for the coinwatch price tracker.
//!
//! This crate provides the types shared by every other crate:
//! - `CoinSnapshot`: one fetched price observation for one coin
//! - `TrackingConfig`: the immutable ingestion settings
//! - `BoxFuture`: boxed future used by the dyn-compatible async seams

pub mod error;
pub mod snapshot;
pub mod tracking;

pub use error::{CoreError, Result};
pub use snapshot::CoinSnapshot;
pub use tracking::{parse_coin_list, TrackingConfig};

use std::future::Future;
use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

//! Shared test utilities for feed integration tests.

pub mod mock_api;

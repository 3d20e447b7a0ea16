//! Vendor-agnostic market data ingestion.
//!
//! [`models`] holds the canonical bar types every provider returns, and
//! [`providers`] holds the [`DataProvider`](providers::DataProvider) trait plus
//! the concrete REST implementations.

pub mod models;
pub mod providers;

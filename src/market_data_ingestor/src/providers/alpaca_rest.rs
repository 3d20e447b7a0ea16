//! Alpaca Market Data v2 REST provider (US equities).

pub mod params;
pub mod provider;
pub mod response;

pub use params::AlpacaBarsParams;
pub use provider::AlpacaProvider;

//! Yahoo Finance v8 chart endpoint provider.
//!
//! Serves equities and indices worldwide (e.g. `INFY.NS`, `^NSEI`) without
//! credentials, one symbol per HTTP request.

pub mod params;
pub mod provider;
pub mod response;

pub use params::YahooChartParams;
pub use provider::YahooChartProvider;

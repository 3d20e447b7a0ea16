//! Daily-bar analytics for a universe of equity and index symbols.
//!
//! Two products come out of one fetch per symbol:
//! - a metrics table of the latest close against rolling 1y/2y/5y highs and
//!   lows and a moving average ([`metrics`], [`table`]);
//! - a two-line trend channel fit to swing highs and lows, projected forward
//!   for charting ([`swing`], [`channel`], [`chart`]).
//!
//! [`pipeline::build_pipeline`] runs a whole universe against any
//! [`DataProvider`](market_data_ingestor::providers::DataProvider).

pub mod channel;
pub mod chart;
pub mod config;
pub mod deviation;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod providers;
pub mod rolling;
pub mod series;
pub mod swing;
pub mod symbols;
pub mod table;
pub mod tz;

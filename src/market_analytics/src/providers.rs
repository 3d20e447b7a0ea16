//! Runtime selection of the market-data source.

use std::{fmt, num::NonZeroU32, str::FromStr};

use market_data_ingestor::providers::{
    DataProvider, ProviderInitError, alpaca_rest::AlpacaProvider, rate_limited::RateLimitedProvider,
    yahoo_chart::YahooChartProvider,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Alpaca,
    #[default]
    Yahoo,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderId::Alpaca => "alpaca",
            ProviderId::Yahoo => "yahoo",
        })
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alpaca" => Ok(ProviderId::Alpaca),
            "yahoo" => Ok(ProviderId::Yahoo),
            other => Err(format!("unknown provider '{other}' (expected alpaca or yahoo)")),
        }
    }
}

/// Builds the concrete provider behind a shared request quota.
///
/// Alpaca credentials come from `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`.
pub fn build_provider(
    id: ProviderId,
    requests_per_minute: NonZeroU32,
) -> Result<Box<dyn DataProvider>, ProviderInitError> {
    info!(provider = %id, requests_per_minute, "initialising data provider");
    Ok(match id {
        ProviderId::Alpaca => Box::new(RateLimitedProvider::per_minute(
            AlpacaProvider::new()?,
            requests_per_minute,
        )),
        ProviderId::Yahoo => Box::new(RateLimitedProvider::per_minute(
            YahooChartProvider::new()?,
            requests_per_minute,
        )),
    })
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;

    use super::*;

    #[test]
    fn parses_and_displays() {
        assert_eq!(" Yahoo ".parse::<ProviderId>().unwrap(), ProviderId::Yahoo);
        assert_eq!("ALPACA".parse::<ProviderId>().unwrap(), ProviderId::Alpaca);
        assert!("polygon".parse::<ProviderId>().is_err());
        assert_eq!(ProviderId::Alpaca.to_string(), "alpaca");
    }

    #[test]
    fn yahoo_needs_no_credentials() {
        let provider = build_provider(ProviderId::Yahoo, nonzero!(60u32)).unwrap();
        assert_eq!(provider.name(), "yahoo");
    }
}

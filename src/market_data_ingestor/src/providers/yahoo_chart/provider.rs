use async_trait::async_trait;
use reqwest::{Client, Url};
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{bar_series::BarSeries, request_params::{BarsRequestParams, ProviderParams}},
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, InternalSnafu, ProviderError,
        ProviderInitError, ReqwestSnafu,
        yahoo_chart::{params::interval_for, response::parse_chart},
    },
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// The endpoint answers 429 to clients without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) market_data_ingestor";

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
}

impl YahooChartProvider {
    pub fn new() -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context(ClientBuildSnafu)?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn symbol_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            InternalSnafu {
                message: format!("invalid base url {}: {e}", self.base_url),
            }
            .build()
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                InternalSnafu {
                    message: format!("base url {} cannot carry a path", self.base_url),
                }
                .build()
            })?
            .push(symbol);
        Ok(url)
    }
}

#[async_trait]
impl DataProvider for YahooChartProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        let interval = interval_for(&params.timeframe)?;
        let extra = match &params.provider_specific {
            ProviderParams::Yahoo(p) => p.clone(),
            _ => Default::default(),
        };
        let adjusted = extra.adjusted_close.unwrap_or(false);

        let mut out = Vec::with_capacity(params.symbols.len());
        for symbol in &params.symbols {
            let url = self.symbol_url(symbol)?;
            let query = [
                ("period1", params.start.timestamp().to_string()),
                ("period2", params.end.timestamp().to_string()),
                ("interval", interval.to_string()),
                ("events", "history".to_string()),
                (
                    "includePrePost",
                    extra.include_pre_post.unwrap_or(false).to_string(),
                ),
            ];

            let response = self
                .client
                .get(url)
                .query(&query)
                .send()
                .await
                .context(ReqwestSnafu)?;
            let status = response.status();
            let body = response.text().await.context(ReqwestSnafu)?;

            if !status.is_success() {
                // Error bodies share the chart envelope; prefer its description.
                return match parse_chart(&body) {
                    Err(e @ ProviderError::Api { .. }) => Err(e),
                    _ => ApiSnafu {
                        message: format!("{status} for {symbol}"),
                    }
                    .fail(),
                };
            }

            let bars = parse_chart(&body)?.into_bars(adjusted);
            debug!(provider = "yahoo", %symbol, bars = bars.len(), "fetched chart");
            if !bars.is_empty() {
                out.push(BarSeries::new(symbol.clone(), params.timeframe, bars));
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_is_percent_encoded_into_path() {
        let provider = YahooChartProvider::new().unwrap();
        let url = provider.symbol_url("M&M.NS").unwrap();
        assert_eq!(
            url.as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/M&M.NS"
        );
        let url = provider.symbol_url("RELIANCE.NS/x").unwrap();
        assert!(url.as_str().ends_with("/chart/RELIANCE.NS%2Fx"));
    }

    #[test]
    fn bad_base_url_is_internal_error() {
        let provider = YahooChartProvider::new()
            .unwrap()
            .with_base_url("not a url");
        let err = provider.symbol_url("INFY.NS").unwrap_err();
        assert!(matches!(err, ProviderError::Internal { .. }));
    }
}

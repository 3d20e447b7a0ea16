use chrono::DateTime;
use serde::Deserialize;
use snafu::ResultExt;

use crate::{
    models::bar::Bar,
    providers::{ApiSnafu, DecodeSnafu, ProviderError},
};

#[derive(Deserialize, Debug)]
pub struct ChartEnvelope {
    pub chart: Chart,
}

#[derive(Deserialize, Debug)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_timezone_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    pub meta: ChartMeta,
    /// Unix seconds; absent when the range holds no trading sessions.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Deserialize, Debug, Default)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

impl ChartResult {
    /// Zips the column arrays into bars.
    ///
    /// Rows with a missing price are skipped (Yahoo emits `null` for halted
    /// sessions); a missing volume becomes `0.0`. With `adjusted_close` the
    /// open, high, low and close are all scaled by `adjclose / close`.
    pub fn into_bars(self, adjusted_close: bool) -> Vec<Bar> {
        let Some(quote) = self.indicators.quote.first() else {
            return Vec::new();
        };
        let adj = self
            .indicators
            .adjclose
            .first()
            .map(|a| a.adjclose.as_slice())
            .unwrap_or(&[]);

        self.timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let timestamp = DateTime::from_timestamp(ts, 0)?;
                let close = at(&quote.close, i)?;
                let factor = match (adjusted_close, at(adj, i)) {
                    (true, Some(adj_close)) if close != 0.0 => adj_close / close,
                    _ => 1.0,
                };
                Some(Bar::ohlcv(
                    timestamp,
                    at(&quote.open, i)? * factor,
                    at(&quote.high, i)? * factor,
                    at(&quote.low, i)? * factor,
                    close * factor,
                    at(&quote.volume, i).unwrap_or(0.0),
                ))
            })
            .collect()
    }
}

/// Decodes a chart response body and unwraps its single result.
pub fn parse_chart(body: &str) -> Result<ChartResult, ProviderError> {
    let envelope: ChartEnvelope = serde_json::from_str(body).context(DecodeSnafu)?;

    if let Some(err) = envelope.chart.error {
        return ApiSnafu {
            message: format!("{}: {}", err.code, err.description),
        }
        .fail();
    }

    match envelope.chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => Ok(result),
        None => ApiSnafu {
            message: "chart response carried no result",
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "currency": "INR",
                    "symbol": "INFY.NS",
                    "exchangeTimezoneName": "Asia/Kolkata",
                    "shortName": "INFOSYS LIMITED"
                },
                "timestamp": [1704167100, 1704253500, 1704339900],
                "indicators": {
                    "quote": [{
                        "open":   [1540.0, null, 1562.5],
                        "high":   [1561.4, 1570.0, 1575.0],
                        "low":    [1535.2, 1550.0, 1555.1],
                        "close":  [1558.6, 1560.0, 1571.3],
                        "volume": [5123400, 4100000, null]
                    }],
                    "adjclose": [{ "adjclose": [1540.1, 1541.0, 1552.7] }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn skips_rows_with_missing_prices() {
        let result = parse_chart(BODY).unwrap();
        assert_eq!(result.meta.symbol, "INFY.NS");
        assert_eq!(result.meta.exchange_timezone_name.as_deref(), Some("Asia/Kolkata"));

        let bars = result.into_bars(false);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 1558.6);
        assert_eq!(bars[0].volume, 5_123_400.0);
        assert_eq!(bars[1].timestamp.timestamp(), 1704339900);
        // null volume is kept as zero so the series cleaner can drop it
        assert_eq!(bars[1].volume, 0.0);
    }

    #[test]
    fn adjusted_close_scales_every_price() {
        let bars = parse_chart(BODY).unwrap().into_bars(true);
        let close_eq = |a: f64, b: f64| (a - b).abs() < 1e-9;

        assert!(close_eq(bars[0].close, 1540.1));
        assert!(close_eq(bars[1].close, 1552.7));

        let factor = 1540.1 / 1558.6;
        assert!(close_eq(bars[0].open, 1540.0 * factor));
        assert!(close_eq(bars[0].high, 1561.4 * factor));
        assert!(close_eq(bars[0].low, 1535.2 * factor));
        assert!(bars[0].low <= bars[0].close && bars[0].close <= bars[0].high);
        assert_eq!(bars[0].volume, 5_123_400.0);
    }

    #[test]
    fn surfaces_api_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(body).unwrap_err();
        assert!(matches!(err, ProviderError::Api { .. }));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = parse_chart("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, ProviderError::Decode { .. }));
    }
}

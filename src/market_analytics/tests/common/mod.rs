#![allow(dead_code)]

use std::{collections::HashMap, time::Duration as StdDuration};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use market_data_ingestor::{
    models::{bar::Bar, bar_series::BarSeries, request_params::BarsRequestParams, timeframe::TimeFrame},
    providers::{ApiSnafu, DataProvider, ProviderError},
};

pub fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 28, 12, 0, 0).unwrap()
}

/// `n` daily bars ending the day before [`as_of`], on a gentle uptrend with a
/// weekly wobble.
pub fn trending_bars(n: usize, volume: f64) -> Vec<Bar> {
    let start = as_of() - Duration::days(n as i64);
    (0..n)
        .map(|i| {
            let base = 1_000.0 + i as f64 * 0.5 + ((i % 7) as f64 - 3.0) * 4.0;
            Bar::ohlcv(
                start + Duration::days(i as i64),
                base,
                base + 10.0,
                base - 10.0,
                base + 2.0,
                volume,
            )
        })
        .collect()
}

pub enum Scripted {
    Bars(Vec<Bar>),
    Fail(String),
    Hang,
    Nothing,
}

/// Serves a fixed answer per ticker.
#[derive(Default)]
pub struct MockProvider {
    answers: HashMap<String, Scripted>,
}

impl MockProvider {
    pub fn with(mut self, ticker: &str, answer: Scripted) -> Self {
        self.answers.insert(ticker.to_string(), answer);
        self
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        let symbol = params.symbols[0].clone();
        match self.answers.get(&symbol) {
            Some(Scripted::Bars(bars)) => Ok(vec![BarSeries::new(symbol, TimeFrame::day(), bars.clone())]),
            Some(Scripted::Fail(message)) => ApiSnafu {
                message: message.clone(),
            }
            .fail(),
            Some(Scripted::Hang) => {
                tokio::time::sleep(StdDuration::from_secs(3600)).await;
                Ok(vec![])
            }
            Some(Scripted::Nothing) | None => Ok(vec![]),
        }
    }
}

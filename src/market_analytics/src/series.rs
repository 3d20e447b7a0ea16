//! Cleaned, time-ordered bar sequence for one symbol.

use chrono::{DateTime, Duration, Utc};
use market_data_ingestor::models::bar::Bar;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalyticsError, AnalyticsResult};

/// Minimum number of bars any downstream regression can work with.
pub const MIN_BARS: usize = 2;

/// Selects one numeric column of a [`Bar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    pub fn of(self, bar: &Bar) -> f64 {
        match self {
            Field::Open => bar.open,
            Field::High => bar.high,
            Field::Low => bar.low,
            Field::Close => bar.close,
            Field::Volume => bar.volume,
        }
    }
}

/// Bars of one symbol with strictly increasing timestamps and positive volume.
///
/// Indices are contiguous from zero; position `i` in [`Series::bars`] is bar
/// index `i` everywhere else in the crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    symbol: String,
    bars: Vec<Bar>,
}

impl Series {
    /// Cleans a raw provider sequence.
    ///
    /// Drops bars with non-finite values or non-positive volume, orders by
    /// timestamp (a repeated timestamp keeps the later bar), then keeps only the
    /// bars within `lookback` of the newest one.
    ///
    /// Errors:
    /// - [`AnalyticsError::EmptySeries`] when fewer than [`MIN_BARS`] remain
    pub fn from_bars(
        symbol: impl Into<String>,
        raw: Vec<Bar>,
        lookback: Duration,
    ) -> AnalyticsResult<Self> {
        let symbol = symbol.into();
        let received = raw.len();

        let mut bars: Vec<Bar> = raw
            .into_iter()
            .filter(|b| b.is_finite() && b.volume > 0.0)
            .collect();
        let usable = bars.len();
        bars.sort_by_key(|b| b.timestamp);

        let mut ordered: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match ordered.last_mut() {
                Some(prev) if prev.timestamp == bar.timestamp => *prev = bar,
                _ => ordered.push(bar),
            }
        }

        // A lookback reaching past the representable range keeps everything.
        if let Some(cutoff) = ordered
            .last()
            .and_then(|b| b.timestamp.checked_sub_signed(lookback))
        {
            ordered.retain(|b| b.timestamp >= cutoff);
        }

        debug!(
            %symbol,
            received,
            dropped_unusable = received - usable,
            kept = ordered.len(),
            "cleaned series"
        );

        if ordered.len() < MIN_BARS {
            return Err(AnalyticsError::EmptySeries {
                symbol,
                remaining: ordered.len(),
            });
        }

        Ok(Self {
            symbol,
            bars: ordered,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.bars.len() - 1
    }

    /// Newest bar. A series always holds at least [`MIN_BARS`] bars.
    pub fn last(&self) -> &Bar {
        &self.bars[self.last_index()]
    }

    pub fn first_timestamp(&self) -> DateTime<Utc> {
        self.bars[0].timestamp
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.last().timestamp
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn values(&self, field: Field) -> Vec<f64> {
        self.bars.iter().map(|b| field.of(b)).collect()
    }
}

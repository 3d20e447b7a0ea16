//! Per-symbol deviation metrics: current close against rolling highs, lows
//! and a moving average.

use std::num::NonZeroUsize;

use chrono::Duration;
use nonzero_ext::nonzero;
use serde::Serialize;

use crate::{
    deviation::Deviation,
    error::{AnalyticsError, AnalyticsResult},
    rolling::{Extreme, RollingWindowResult, Window, rolling_extreme, rolling_mean},
    series::{Field, Series},
};

/// Windows used for the metric columns.
///
/// The long horizon is the whole loaded series, so its length is set by the
/// fetch lookback rather than here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSettings {
    pub one_year: Duration,
    pub two_year: Duration,
    pub ma_period: NonZeroUsize,
}

impl Default for MetricSettings {
    fn default() -> Self {
        Self {
            one_year: Duration::days(365),
            two_year: Duration::days(730),
            ma_period: nonzero!(200usize),
        }
    }
}

/// Deviations of the latest close for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviationSet {
    pub current_price: f64,
    pub high_1y: Deviation,
    pub high_2y: Deviation,
    pub high_5y: Deviation,
    pub low_1y: Deviation,
    pub low_2y: Deviation,
    pub low_5y: Deviation,
    /// Missing when the series is shorter than the moving-average period.
    pub ma: Option<Deviation>,
}

/// Computes every deviation column for `series`.
///
/// Errors:
/// - [`AnalyticsError::DivisionByZero`] when any reference is zero
pub fn compute_metrics(series: &Series, settings: &MetricSettings) -> AnalyticsResult<DeviationSet> {
    let current = series.last().close;

    let latest = |field: Field, window: Window, kind: Extreme| {
        latest_of(series, &rolling_extreme(series, field, window, kind))
    };

    let high_1y = latest(Field::High, Window::Calendar(settings.one_year), Extreme::Max)?;
    let high_2y = latest(Field::High, Window::Calendar(settings.two_year), Extreme::Max)?;
    let high_5y = latest(Field::High, Window::Unbounded, Extreme::Max)?;
    let low_1y = latest(Field::Low, Window::Calendar(settings.one_year), Extreme::Min)?;
    let low_2y = latest(Field::Low, Window::Calendar(settings.two_year), Extreme::Min)?;
    let low_5y = latest(Field::Low, Window::Unbounded, Extreme::Min)?;

    let ma = rolling_mean(series, Field::Close, settings.ma_period)
        .last()
        .map(|avg| Deviation::between(current, avg))
        .transpose()?;

    Ok(DeviationSet {
        current_price: current,
        high_1y: Deviation::between(current, high_1y)?,
        high_2y: Deviation::between(current, high_2y)?,
        high_5y: Deviation::between(current, high_5y)?,
        low_1y: Deviation::between(current, low_1y)?,
        low_2y: Deviation::between(current, low_2y)?,
        low_5y: Deviation::between(current, low_5y)?,
        ma,
    })
}

fn latest_of(series: &Series, result: &RollingWindowResult) -> AnalyticsResult<f64> {
    result.last().ok_or_else(|| AnalyticsError::EmptySeries {
        symbol: series.symbol().to_string(),
        remaining: series.len(),
    })
}

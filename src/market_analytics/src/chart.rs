//! Channel analysis of one series, shaped for a candlestick renderer.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::{
    channel::{Channel, ChannelFitter},
    error::AnalyticsResult,
    series::Series,
    swing::SwingDetector,
    tz::local_date,
};

/// One historical bar with both envelopes and both fitted lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub index: usize,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub swing_high: Option<f64>,
    pub swing_low: Option<f64>,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionRow {
    pub index: usize,
    pub date: NaiveDate,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelAnalysis {
    pub ticker: String,
    pub window: usize,
    pub channel: Channel,
    pub bars: Vec<ChartRow>,
    pub projection: Vec<ProjectionRow>,
}

/// Swing envelopes, channel fit, and forward rays for `series`.
///
/// Dates are rendered in `tz` when given, UTC otherwise.
pub fn analyze_channel(
    series: &Series,
    detector: &SwingDetector,
    fitter: &ChannelFitter,
    tz: Option<Tz>,
) -> AnalyticsResult<ChannelAnalysis> {
    let envelope = detector.detect(series);
    let channel = fitter.fit(&envelope.swing_highs(), &envelope.swing_lows())?;

    let bars = series
        .bars()
        .iter()
        .enumerate()
        .map(|(index, bar)| ChartRow {
            index,
            date: local_date(bar.timestamp, tz),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            swing_high: envelope.highs.get(index),
            swing_low: envelope.lows.get(index),
            upper: channel.upper.value_at(index),
            lower: channel.lower.value_at(index),
        })
        .collect();

    let anchor = series.last_timestamp();
    let upper = fitter.project(&channel.upper, series.last_index(), anchor);
    let lower = fitter.project(&channel.lower, series.last_index(), anchor);
    let projection = upper
        .iter()
        .zip(&lower)
        .map(|(u, l)| ProjectionRow {
            index: u.index,
            date: local_date(u.timestamp, tz),
            upper: u.value,
            lower: l.value,
        })
        .collect();

    debug!(
        symbol = series.symbol(),
        window = envelope.window.get(),
        upper_slope = channel.upper.slope,
        lower_slope = channel.lower.slope,
        "fitted channel"
    );

    Ok(ChannelAnalysis {
        ticker: series.symbol().to_string(),
        window: envelope.window.get(),
        channel,
        bars,
        projection,
    })
}

//! Batch pipeline: fetch, clean, and analyse every symbol of a universe.
//!
//! Each symbol runs `fetch -> Series -> (metrics, channel)` on its own. Symbols
//! are processed concurrently up to [`PipelineSettings::concurrency`]; the
//! provider passed in is expected to carry its own request quota (see
//! [`build_provider`](crate::providers::build_provider)). A failing symbol
//! becomes an [`Exclusion`] and never stops the batch.

use std::{fmt, num::NonZeroUsize, time::Duration as StdDuration};

use anyhow::ensure;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use futures::{StreamExt, stream};
use market_data_ingestor::{
    models::{bar::Bar, request_params::BarsRequestParams},
    providers::DataProvider,
};
use nonzero_ext::nonzero;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    channel::ChannelFitter,
    chart::{ChannelAnalysis, analyze_channel},
    error::{AnalyticsError, AnalyticsResult},
    metrics::{MetricSettings, compute_metrics},
    series::Series,
    swing::SwingDetector,
    symbols::SymbolSpec,
    table::{MetricsRow, MetricsTable},
};

/// Five years plus a leap day.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 1826;

/// Upper bound for the lookback and every calendar window, about a century.
pub const MAX_SPAN_DAYS: i64 = 36_500;

/// Upper bound for the projection horizon.
pub const MAX_HORIZON_DAYS: usize = 3_650;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub lookback: Duration,
    pub concurrency: NonZeroUsize,
    pub fetch_timeout: StdDuration,
    pub metrics: MetricSettings,
    pub detector: SwingDetector,
    pub fitter: ChannelFitter,
    /// Exchange zone for rendered dates.
    pub tz: Option<Tz>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            lookback: Duration::days(DEFAULT_LOOKBACK_DAYS),
            concurrency: nonzero!(4usize),
            fetch_timeout: StdDuration::from_secs(30),
            metrics: MetricSettings::default(),
            detector: SwingDetector::default(),
            fitter: ChannelFitter::default(),
            tz: None,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        let max_span = Duration::days(MAX_SPAN_DAYS);
        ensure!(
            self.lookback > Duration::zero() && self.lookback <= max_span,
            "lookback must be between 1 and {MAX_SPAN_DAYS} days"
        );
        ensure!(!self.fetch_timeout.is_zero(), "fetch timeout must be positive");
        for window in [self.metrics.one_year, self.metrics.two_year] {
            ensure!(
                window > Duration::zero() && window <= max_span,
                "metric windows must be between 1 and {MAX_SPAN_DAYS} days"
            );
        }
        ensure!(
            self.fitter.horizon_days <= MAX_HORIZON_DAYS,
            "projection horizon must be at most {MAX_HORIZON_DAYS} days"
        );
        let fraction = self.detector.fraction();
        ensure!(
            fraction.is_finite() && fraction > 0.0 && fraction <= 1.0,
            "swing fraction must be in (0, 1], got {fraction}"
        );
        Ok(())
    }
}

/// Everything derived for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub row: MetricsRow,
    pub channel: ChannelAnalysis,
}

/// A symbol left out of the batch and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub ticker: String,
    pub name: String,
    pub kind: &'static str,
    pub reason: String,
}

impl Exclusion {
    fn new(spec: &SymbolSpec, err: &AnalyticsError) -> Self {
        Self {
            ticker: spec.ticker.clone(),
            name: spec.name.clone(),
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.ticker, self.reason)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub as_of: DateTime<Utc>,
    /// In universe order.
    pub reports: Vec<SymbolReport>,
    /// In universe order.
    pub exclusions: Vec<Exclusion>,
}

impl BatchReport {
    pub fn metrics_table(&self) -> MetricsTable {
        MetricsTable::new(self.reports.iter().map(|r| r.row.clone()).collect())
    }

    pub fn channel(&self, ticker: &str) -> Option<&ChannelAnalysis> {
        self.reports
            .iter()
            .find(|r| r.row.ticker.eq_ignore_ascii_case(ticker))
            .map(|r| &r.channel)
    }
}

/// Pure part of the per-symbol pipeline, from raw bars to a report.
pub fn analyze_bars(
    spec: &SymbolSpec,
    raw: Vec<Bar>,
    settings: &PipelineSettings,
) -> AnalyticsResult<SymbolReport> {
    let series = Series::from_bars(spec.ticker.as_str(), raw, settings.lookback)?;
    let metrics = compute_metrics(&series, &settings.metrics)?;
    let channel = analyze_channel(&series, &settings.detector, &settings.fitter, settings.tz)?;

    Ok(SymbolReport {
        row: MetricsRow {
            ticker: spec.ticker.clone(),
            name: spec.name.clone(),
            industry: spec.industry.clone(),
            metrics,
        },
        channel,
    })
}

/// Fetches daily bars for `spec` ending at `as_of`, bounded by the fetch timeout.
///
/// Waiting for the provider's request quota happens before the timeout starts.
///
/// Errors:
/// - [`AnalyticsError::FetchFailure`] on provider error or timeout
/// - [`AnalyticsError::EmptySeries`] when the provider returned nothing for the ticker
pub async fn fetch_bars(
    provider: &dyn DataProvider,
    spec: &SymbolSpec,
    settings: &PipelineSettings,
    as_of: DateTime<Utc>,
) -> AnalyticsResult<Vec<Bar>> {
    let params =
        BarsRequestParams::daily_lookback(spec.ticker.as_str(), as_of, settings.lookback, spec.asset_class);

    provider.ready().await;
    let fetched = tokio::time::timeout(settings.fetch_timeout, provider.fetch_admitted(params))
        .await
        .map_err(|_| AnalyticsError::FetchFailure {
            symbol: spec.ticker.clone(),
            reason: format!("timed out after {}s", settings.fetch_timeout.as_secs_f64()),
        })?
        .map_err(|e| AnalyticsError::FetchFailure {
            symbol: spec.ticker.clone(),
            reason: e.to_string(),
        })?;

    fetched
        .into_iter()
        .find(|s| s.symbol.eq_ignore_ascii_case(&spec.ticker))
        .map(|s| s.bars)
        .ok_or_else(|| AnalyticsError::EmptySeries {
            symbol: spec.ticker.clone(),
            remaining: 0,
        })
}

#[instrument(skip_all, fields(ticker = %spec.ticker))]
pub async fn analyze_symbol(
    provider: &dyn DataProvider,
    spec: &SymbolSpec,
    settings: &PipelineSettings,
    as_of: DateTime<Utc>,
) -> AnalyticsResult<SymbolReport> {
    let raw = fetch_bars(provider, spec, settings, as_of).await?;
    debug!(bars = raw.len(), "fetched");
    analyze_bars(spec, raw, settings)
}

/// Runs every symbol of `symbols` against `provider`.
///
/// Per-symbol failures land in [`BatchReport::exclusions`]; only invalid
/// settings fail the call itself.
pub async fn build_pipeline(
    provider: &dyn DataProvider,
    symbols: &[SymbolSpec],
    settings: &PipelineSettings,
    as_of: DateTime<Utc>,
) -> anyhow::Result<BatchReport> {
    settings.validate()?;
    info!(
        provider = provider.name(),
        symbols = symbols.len(),
        concurrency = settings.concurrency.get(),
        %as_of,
        "starting batch"
    );

    let mut outcomes: Vec<(usize, AnalyticsResult<SymbolReport>)> =
        stream::iter(symbols.iter().enumerate())
            .map(move |(pos, spec)| async move {
                (pos, analyze_symbol(provider, spec, settings, as_of).await)
            })
            .buffer_unordered(settings.concurrency.get())
            .collect()
            .await;
    outcomes.sort_by_key(|(pos, _)| *pos);

    let mut reports = Vec::new();
    let mut exclusions = Vec::new();
    for (pos, outcome) in outcomes {
        let spec = &symbols[pos];
        match outcome {
            Ok(report) => reports.push(report),
            Err(err) => {
                warn!(ticker = %spec.ticker, kind = err.kind(), error = %err, "excluding symbol");
                exclusions.push(Exclusion::new(spec, &err));
            }
        }
    }

    info!(
        analysed = reports.len(),
        excluded = exclusions.len(),
        "batch complete"
    );
    Ok(BatchReport {
        as_of,
        reports,
        exclusions,
    })
}

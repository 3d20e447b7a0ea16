//! Failure taxonomy of the per-symbol pipeline.

use thiserror::Error;

/// Why one symbol could not be analysed.
///
/// Every variant is recoverable at the batch level: the pipeline turns it into
/// an [`Exclusion`](crate::pipeline::Exclusion) and moves on.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The data source was unavailable, timed out, or does not know the symbol.
    #[error("failed to fetch {symbol}: {reason}")]
    FetchFailure { symbol: String, reason: String },

    /// Fewer than two usable bars survived cleaning.
    #[error("no usable bars for {symbol} ({remaining} left after cleaning)")]
    EmptySeries { symbol: String, remaining: usize },

    /// A regression was asked to fit fewer than two distinct indices.
    #[error("need at least 2 distinct points to fit a line, got {distinct}")]
    InsufficientPoints { distinct: usize },

    /// A deviation was taken against a zero or non-finite reference.
    #[error("cannot compute deviation from reference {reference}")]
    DivisionByZero { reference: f64 },
}

impl AnalyticsError {
    /// Stable short code for reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyticsError::FetchFailure { .. } => "fetch_failure",
            AnalyticsError::EmptySeries { .. } => "empty_series",
            AnalyticsError::InsufficientPoints { .. } => "insufficient_points",
            AnalyticsError::DivisionByZero { .. } => "division_by_zero",
        }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

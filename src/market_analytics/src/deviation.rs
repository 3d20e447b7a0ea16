//! Signed percentage distance of a current value from a reference.

use std::fmt;

use serde::Serialize;

use crate::error::{AnalyticsError, AnalyticsResult};

/// `(current - reference) / reference * 100`.
///
/// Errors:
/// - [`AnalyticsError::DivisionByZero`] when `reference` is zero or either
///   input is not finite
pub fn pct_diff(current: f64, reference: f64) -> AnalyticsResult<f64> {
    if reference == 0.0 || !reference.is_finite() || !current.is_finite() {
        return Err(AnalyticsError::DivisionByZero { reference });
    }
    Ok((current - reference) / reference * 100.0)
}

/// Rounds half away from zero to two decimals, for display only.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A deviation together with the two inputs it was computed from.
///
/// `pct` is unrounded; comparisons and sorting use it directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Deviation {
    pub current: f64,
    pub reference: f64,
    pub pct: f64,
}

impl Deviation {
    pub fn between(current: f64, reference: f64) -> AnalyticsResult<Self> {
        Ok(Self {
            current,
            reference,
            pct: pct_diff(current, reference)?,
        })
    }

    pub fn rounded(&self) -> f64 {
        round2(self.pct)
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.pct)
    }
}

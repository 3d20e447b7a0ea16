//! Rolling high/low envelopes and the swing points drawn from them.

use std::num::NonZeroUsize;

use serde::Serialize;

use crate::{
    rolling::{Extreme, RollingWindowResult, Window, rolling_extreme},
    series::{Field, Series},
};

/// Envelope window as a share of the series length.
pub const DEFAULT_SWING_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwingPoint {
    pub index: usize,
    pub value: f64,
}

/// Swing points of one side (highs or lows), in index order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SwingPointSet {
    points: Vec<SwingPoint>,
}

impl SwingPointSet {
    pub fn new(points: Vec<SwingPoint>) -> Self {
        Self { points }
    }

    /// Every bar of `result` that carries a value.
    pub fn from_result(result: &RollingWindowResult) -> Self {
        Self::new(
            result
                .defined()
                .map(|(index, value)| SwingPoint { index, value })
                .collect(),
        )
    }

    pub fn points(&self) -> &[SwingPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Rolling max of highs and rolling min of lows over one shared window.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingEnvelope {
    pub window: NonZeroUsize,
    pub highs: RollingWindowResult,
    pub lows: RollingWindowResult,
}

impl SwingEnvelope {
    pub fn swing_highs(&self) -> SwingPointSet {
        SwingPointSet::from_result(&self.highs)
    }

    pub fn swing_lows(&self) -> SwingPointSet {
        SwingPointSet::from_result(&self.lows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingDetector {
    fraction: f64,
}

impl Default for SwingDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SWING_FRACTION)
    }
}

impl SwingDetector {
    pub fn new(fraction: f64) -> Self {
        Self { fraction }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// `floor(len * fraction)`, never below one bar.
    ///
    /// A non-finite or negative fraction also yields one bar.
    pub fn window_for(&self, len: usize) -> NonZeroUsize {
        let raw = (len as f64 * self.fraction).floor();
        let bars = if raw.is_finite() && raw >= 1.0 {
            (raw as usize).min(len.max(1))
        } else {
            1
        };
        NonZeroUsize::new(bars).unwrap_or(NonZeroUsize::MIN)
    }

    /// Builds both envelopes with partial windows at the start of the series.
    ///
    /// Because partial windows are accepted, every bar index appears in both
    /// swing sets; short series collapse to a window of one, where the envelope
    /// is the bar's own high or low.
    pub fn detect(&self, series: &Series) -> SwingEnvelope {
        let window = self.window_for(series.len());
        SwingEnvelope {
            window,
            highs: rolling_extreme(series, Field::High, Window::Bars(window), Extreme::Max),
            lows: rolling_extreme(series, Field::Low, Window::Bars(window), Extreme::Min),
        }
    }
}

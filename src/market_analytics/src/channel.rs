//! Two-line trend channel: OLS fits through swing highs and swing lows, plus
//! forward projection of each line.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    swing::{SwingPoint, SwingPointSet},
};

/// Projection length used by the dashboard chart.
pub const DEFAULT_HORIZON_DAYS: usize = 120;

/// `value(i) = slope * i + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelLine {
    pub slope: f64,
    pub intercept: f64,
}

impl ChannelLine {
    pub fn value_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }
}

/// Ordinary least squares of value against index.
///
/// Errors:
/// - [`AnalyticsError::InsufficientPoints`] with fewer than two distinct indices
pub fn fit_line(points: &[SwingPoint]) -> AnalyticsResult<ChannelLine> {
    let distinct = points.iter().map(|p| p.index).collect::<BTreeSet<_>>().len();
    if distinct < 2 {
        return Err(AnalyticsError::InsufficientPoints { distinct });
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.index as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.value).sum::<f64>() / n;

    // Centered sums keep precision when indices run into the thousands.
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
        let dx = p.index as f64 - mean_x;
        (sxx + dx * dx, sxy + dx * (p.value - mean_y))
    });

    let slope = sxy / sxx;
    Ok(ChannelLine {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Upper line from swing highs (resistance), lower line from swing lows (support).
///
/// The lines are fit independently and may cross.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Channel {
    pub upper: ChannelLine,
    pub lower: ChannelLine,
}

/// One projected value on a calendar-day axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Evaluates `line` on `last_index + 1 ..= last_index + horizon_days`.
///
/// Step `k` is dated `anchor + k days`; weekends and holidays are not skipped.
pub fn project(
    line: &ChannelLine,
    last_index: usize,
    anchor: DateTime<Utc>,
    horizon_days: usize,
) -> Vec<ProjectedPoint> {
    (1..=horizon_days)
        .map(|k| {
            let index = last_index + k;
            ProjectedPoint {
                index,
                timestamp: anchor + Duration::days(k as i64),
                value: line.value_at(index),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFitter {
    pub horizon_days: usize,
}

impl Default for ChannelFitter {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl ChannelFitter {
    pub fn new(horizon_days: usize) -> Self {
        Self { horizon_days }
    }

    pub fn fit(&self, swing_highs: &SwingPointSet, swing_lows: &SwingPointSet) -> AnalyticsResult<Channel> {
        Ok(Channel {
            upper: fit_line(swing_highs.points())?,
            lower: fit_line(swing_lows.points())?,
        })
    }

    pub fn project(
        &self,
        line: &ChannelLine,
        last_index: usize,
        anchor: DateTime<Utc>,
    ) -> Vec<ProjectedPoint> {
        project(line, last_index, anchor, self.horizon_days)
    }
}

//! Trailing-window statistics over a [`Series`].
//!
//! Every result is causal: the value at bar `i` only reads bars `..=i`.
//! Windows come in three shapes:
//! - [`Window::Bars`]: the last `n` bars, fewer at the start of the series.
//! - [`Window::Calendar`]: every bar whose timestamp lies in `[t_i - span, t_i]`.
//!   The bar count varies with weekends and holidays.
//! - [`Window::Unbounded`]: everything up to `i` (full-history extreme).
//!
//! Extremes run in O(n) with a monotonic deque; calendar windows advance the
//! left edge with a second pointer over the timestamps.

use std::{collections::VecDeque, num::NonZeroUsize};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::series::{Field, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Bars(NonZeroUsize),
    Calendar(Duration),
    Unbounded,
}

impl Window {
    pub fn days(days: i64) -> Self {
        Window::Calendar(Duration::days(days))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Extreme {
    Max,
    Min,
}

impl Extreme {
    /// Whether `candidate` makes `incumbent` irrelevant for every later window.
    fn supersedes(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Extreme::Max => candidate >= incumbent,
            Extreme::Min => candidate <= incumbent,
        }
    }
}

/// One optional value per bar, aligned with the input series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RollingWindowResult {
    values: Vec<Option<f64>>,
}

impl RollingWindowResult {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Value at the newest bar, the "current" reading.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// `(index, value)` for every bar, missing values included.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<f64>)> + '_ {
        self.values.iter().copied().enumerate()
    }

    /// `(index, value)` for bars where the statistic is defined.
    pub fn defined(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.iter().filter_map(|(i, v)| v.map(|v| (i, v)))
    }
}

/// Rolling maximum or minimum of `field`.
///
/// Partial windows are allowed, so every bar gets a value.
pub fn rolling_extreme(
    series: &Series,
    field: Field,
    window: Window,
    kind: Extreme,
) -> RollingWindowResult {
    let values = series.values(field);
    let out = match window {
        Window::Bars(n) => extreme_by_count(&values, n.get(), kind),
        Window::Calendar(span) => extreme_by_span(&series.timestamps(), &values, span, kind),
        Window::Unbounded => sliding_extreme(&values, kind, |_| 0),
    };
    RollingWindowResult::new(out.into_iter().map(Some).collect())
}

/// Arithmetic mean of `field` over the last `period` bars.
///
/// Missing until `period` bars are available.
pub fn rolling_mean(series: &Series, field: Field, period: NonZeroUsize) -> RollingWindowResult {
    RollingWindowResult::new(mean_by_count(&series.values(field), period.get()))
}

/// Count-based extreme with `min_periods = 1`.
pub fn extreme_by_count(values: &[f64], window: usize, kind: Extreme) -> Vec<f64> {
    let window = window.max(1);
    sliding_extreme(values, kind, |i| (i + 1).saturating_sub(window))
}

/// Calendar-span extreme over `[t_i - span, t_i]`.
///
/// `timestamps` must be sorted ascending and as long as `values`.
pub fn extreme_by_span(
    timestamps: &[DateTime<Utc>],
    values: &[f64],
    span: Duration,
    kind: Extreme,
) -> Vec<f64> {
    debug_assert_eq!(timestamps.len(), values.len());
    let mut lo = 0usize;
    sliding_extreme(values, kind, |i| {
        let Some(cutoff) = timestamps[i].checked_sub_signed(span) else {
            return lo;
        };
        while lo < i && timestamps[lo] < cutoff {
            lo += 1;
        }
        lo
    })
}

fn sliding_extreme(
    values: &[f64],
    kind: Extreme,
    mut window_start: impl FnMut(usize) -> usize,
) -> Vec<f64> {
    // Indices whose values are monotonic in `kind`; the front is the extreme.
    let mut deque: VecDeque<usize> = VecDeque::new();
    let mut out = Vec::with_capacity(values.len());

    for (i, &v) in values.iter().enumerate() {
        while deque
            .back()
            .is_some_and(|&back| kind.supersedes(v, values[back]))
        {
            deque.pop_back();
        }
        deque.push_back(i);

        let lo = window_start(i);
        while deque.front().is_some_and(|&front| front < lo) {
            deque.pop_front();
        }

        // `i` itself is never evicted, so the deque is non-empty here.
        if let Some(&front) = deque.front() {
            out.push(values[front]);
        }
    }

    out
}

fn mean_by_count(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let period = period.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(sum / period as f64));
        } else {
            out.push(None);
        }
    }

    out
}

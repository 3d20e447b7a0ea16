//! The metrics table: one row per symbol, sortable by any column.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::Serialize;

use crate::metrics::DeviationSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub ticker: String,
    pub name: String,
    pub industry: String,
    #[serde(flatten)]
    pub metrics: DeviationSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Ticker,
    Industry,
    CurrentPrice,
    High1y,
    High2y,
    High5y,
    Low1y,
    Low2y,
    Low5y,
    MovingAverage,
}

impl Column {
    /// Columns in display order.
    pub const DISPLAY: [Column; 9] = [
        Column::Name,
        Column::CurrentPrice,
        Column::High1y,
        Column::High2y,
        Column::High5y,
        Column::Low1y,
        Column::Low2y,
        Column::Low5y,
        Column::MovingAverage,
    ];

    const ALL: [Column; 11] = [
        Column::Name,
        Column::Ticker,
        Column::Industry,
        Column::CurrentPrice,
        Column::High1y,
        Column::High2y,
        Column::High5y,
        Column::Low1y,
        Column::Low2y,
        Column::Low5y,
        Column::MovingAverage,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Ticker => "Ticker",
            Column::Industry => "Industry",
            Column::CurrentPrice => "Current Price",
            Column::High1y => "1Y High % Diff",
            Column::High2y => "2Y High % Diff",
            Column::High5y => "5Y High % Diff",
            Column::Low1y => "1Y Low % Diff",
            Column::Low2y => "2Y Low % Diff",
            Column::Low5y => "5Y Low % Diff",
            Column::MovingAverage => "200D MA % Diff",
        }
    }

    /// Short identifier for CLI flags and query strings.
    pub fn key(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Ticker => "ticker",
            Column::Industry => "industry",
            Column::CurrentPrice => "current_price",
            Column::High1y => "high_1y",
            Column::High2y => "high_2y",
            Column::High5y => "high_5y",
            Column::Low1y => "low_1y",
            Column::Low2y => "low_2y",
            Column::Low5y => "low_5y",
            Column::MovingAverage => "ma",
        }
    }

    fn number(self, row: &MetricsRow) -> Option<f64> {
        let m = &row.metrics;
        match self {
            Column::Name | Column::Ticker | Column::Industry => None,
            Column::CurrentPrice => Some(m.current_price),
            Column::High1y => Some(m.high_1y.pct),
            Column::High2y => Some(m.high_2y.pct),
            Column::High5y => Some(m.high_5y.pct),
            Column::Low1y => Some(m.low_1y.pct),
            Column::Low2y => Some(m.low_2y.pct),
            Column::Low5y => Some(m.low_5y.pct),
            Column::MovingAverage => m.ma.map(|d| d.pct),
        }
    }

    fn text(self, row: &MetricsRow) -> Option<&str> {
        match self {
            Column::Name => Some(&row.name),
            Column::Ticker => Some(&row.ticker),
            Column::Industry => Some(&row.industry),
            _ => None,
        }
    }

    fn is_text(self) -> bool {
        matches!(self, Column::Name | Column::Ticker | Column::Industry)
    }

    /// Display cell; deviations are shown with two decimals.
    pub fn cell(self, row: &MetricsRow) -> String {
        match self {
            Column::CurrentPrice => format_thousands(row.metrics.current_price),
            c if c.is_text() => c.text(row).unwrap_or_default().to_string(),
            c => c.number(row).map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into()),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown column '{0}'")]
pub struct UnknownColumn(pub String);

impl FromStr for Column {
    type Err = UnknownColumn;

    /// Accepts either the display label ("1Y High % Diff") or the key ("high_1y"),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s) || c.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order '{other}' (expected asc or desc)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricsTable {
    rows: Vec<MetricsRow>,
}

impl MetricsTable {
    pub fn new(rows: Vec<MetricsRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable sort on the unrounded value of `column`.
    ///
    /// Rows without a value (no moving average yet) go last in either order.
    pub fn sort_by(&mut self, column: Column, order: SortOrder) {
        let directed = |ord: Ordering| match order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        };

        if column.is_text() {
            self.rows
                .sort_by(|a, b| directed(column.text(a).cmp(&column.text(b))));
            return;
        }

        self.rows
            .sort_by(|a, b| match (column.number(a), column.number(b)) {
                (Some(x), Some(y)) => directed(x.total_cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
    }

    /// Plain-text rendering with aligned columns.
    pub fn render(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| Column::DISPLAY.iter().map(|c| c.cell(row)).collect())
            .collect();

        let widths: Vec<usize> = Column::DISPLAY
            .iter()
            .enumerate()
            .map(|(i, c)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(c.label().len()))
                    .max()
                    .unwrap_or_default()
            })
            .collect();

        let mut out = String::new();
        let header: Vec<String> = Column::DISPLAY
            .iter()
            .zip(&widths)
            .map(|(c, &w)| pad(c.label(), w, c.is_text()))
            .collect();
        out.push_str(header.join("  ").trim_end());
        out.push('\n');

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(Column::DISPLAY.iter().zip(&widths))
                .map(|(cell, (c, &w))| pad(cell, w, c.is_text()))
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}

fn pad(s: &str, width: usize, left: bool) -> String {
    if left {
        format!("{s:<width$}")
    } else {
        format!("{s:>width$}")
    }
}

/// Whole-number price with comma thousands separators; the fraction is
/// truncated, not rounded.
pub fn format_thousands(value: f64) -> String {
    let whole = value.trunc();
    if !whole.is_finite() {
        return value.to_string();
    }
    let digits = format!("{:.0}", whole.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if whole < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

#[cfg(test)]
mod tests {
    use crate::deviation::Deviation;

    use super::*;

    fn dev(pct: f64) -> Deviation {
        Deviation {
            current: 100.0,
            reference: 100.0,
            pct,
        }
    }

    fn row(name: &str, price: f64, high_1y: f64, ma: Option<f64>) -> MetricsRow {
        MetricsRow {
            ticker: format!("{}.NS", name.to_uppercase()),
            name: name.into(),
            industry: "Test".into(),
            metrics: DeviationSet {
                current_price: price,
                high_1y: dev(high_1y),
                high_2y: dev(0.0),
                high_5y: dev(0.0),
                low_1y: dev(0.0),
                low_2y: dev(0.0),
                low_5y: dev(0.0),
                ma: ma.map(dev),
            },
        }
    }

    fn names(t: &MetricsTable) -> Vec<&str> {
        t.rows().iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn parses_labels_and_keys() {
        assert_eq!("1Y High % Diff".parse::<Column>().unwrap(), Column::High1y);
        assert_eq!("current price".parse::<Column>().unwrap(), Column::CurrentPrice);
        assert_eq!("low_5y".parse::<Column>().unwrap(), Column::Low5y);
        assert_eq!("200D MA % Diff".parse::<Column>().unwrap(), Column::MovingAverage);
        assert!("volume".parse::<Column>().is_err());
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Descending);
    }

    #[test]
    fn sorts_on_unrounded_values() {
        // both display as -5.00
        let mut t = MetricsTable::new(vec![
            row("a", 1.0, -4.996, None),
            row("b", 1.0, -5.004, None),
        ]);
        t.sort_by(Column::High1y, SortOrder::Ascending);
        assert_eq!(names(&t), ["b", "a"]);
        t.sort_by(Column::High1y, SortOrder::Descending);
        assert_eq!(names(&t), ["a", "b"]);
    }

    #[test]
    fn missing_values_sort_last_both_ways() {
        let mut t = MetricsTable::new(vec![
            row("none", 1.0, 0.0, None),
            row("low", 1.0, 0.0, Some(-3.0)),
            row("high", 1.0, 0.0, Some(7.5)),
        ]);
        t.sort_by(Column::MovingAverage, SortOrder::Ascending);
        assert_eq!(names(&t), ["low", "high", "none"]);
        t.sort_by(Column::MovingAverage, SortOrder::Descending);
        assert_eq!(names(&t), ["high", "low", "none"]);
    }

    #[test]
    fn sorts_by_name() {
        let mut t = MetricsTable::new(vec![row("wipro", 1.0, 0.0, None), row("infy", 1.0, 0.0, None)]);
        t.sort_by(Column::Name, SortOrder::Ascending);
        assert_eq!(names(&t), ["infy", "wipro"]);
    }

    #[test]
    fn thousands_truncate_like_int() {
        assert_eq!(format_thousands(2_987.99), "2,987");
        assert_eq!(format_thousands(999.5), "999");
        assert_eq!(format_thousands(1_234_567.0), "1,234,567");
        assert_eq!(format_thousands(0.4), "0");
        assert_eq!(format_thousands(-12_345.6), "-12,345");
    }

    #[test]
    fn render_aligns_and_formats() {
        let t = MetricsTable::new(vec![row("Infosys", 1_456.7, -16.666_66, Some(2.0))]);
        let text = t.render();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Name"));
        assert!(header.ends_with("200D MA % Diff"));
        let body = lines.next().unwrap();
        assert!(body.contains("1,456"));
        assert!(body.contains("-16.67"));
        assert!(body.ends_with("2.00"));
    }
}

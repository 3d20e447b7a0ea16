use serde::{Deserialize, Serialize};

use crate::{
    models::timeframe::{TimeFrame, TimeFrameUnit},
    providers::{ProviderError, ValidationSnafu},
};

/// Yahoo-specific parameters for a chart request.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct YahooChartParams {
    /// Include pre- and post-market data for intraday intervals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_pre_post: Option<bool>,
    /// Scale every price by `adjclose / close` so the bar is split and
    /// dividend adjusted. Rows without an adjusted close stay raw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_close: Option<bool>,
}

/// Maps a timeframe onto one of Yahoo's fixed `interval` values.
pub fn interval_for(tf: &TimeFrame) -> Result<&'static str, ProviderError> {
    let interval = match (tf.unit, tf.amount) {
        (TimeFrameUnit::Minute, 1) => Some("1m"),
        (TimeFrameUnit::Minute, 2) => Some("2m"),
        (TimeFrameUnit::Minute, 5) => Some("5m"),
        (TimeFrameUnit::Minute, 15) => Some("15m"),
        (TimeFrameUnit::Minute, 30) => Some("30m"),
        (TimeFrameUnit::Minute, 60) | (TimeFrameUnit::Hour, 1) => Some("1h"),
        (TimeFrameUnit::Minute, 90) => Some("90m"),
        (TimeFrameUnit::Day, 1) => Some("1d"),
        (TimeFrameUnit::Day, 5) => Some("5d"),
        (TimeFrameUnit::Week, 1) => Some("1wk"),
        (TimeFrameUnit::Month, 1) => Some("1mo"),
        (TimeFrameUnit::Month, 3) => Some("3mo"),
        _ => None,
    };

    match interval {
        Some(i) => Ok(i),
        None => ValidationSnafu {
            message: format!("timeframe {tf} has no Yahoo chart interval"),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_intervals() {
        assert_eq!(interval_for(&TimeFrame::day()).unwrap(), "1d");
        assert_eq!(
            interval_for(&TimeFrame::new(1, TimeFrameUnit::Week)).unwrap(),
            "1wk"
        );
        assert_eq!(
            interval_for(&TimeFrame::new(60, TimeFrameUnit::Minute)).unwrap(),
            interval_for(&TimeFrame::new(1, TimeFrameUnit::Hour)).unwrap()
        );
    }

    #[test]
    fn rejects_unmapped_intervals() {
        let err = interval_for(&TimeFrame::new(2, TimeFrameUnit::Day)).unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
        assert!(interval_for(&TimeFrame::new(4, TimeFrameUnit::Hour)).is_err());
    }
}

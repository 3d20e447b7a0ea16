use serde::{Deserialize, Serialize};

use crate::{
    models::{
        asset::AssetClass,
        request_params::{BarsRequestParams, ProviderParams},
        timeframe::{TimeFrame, TimeFrameUnit},
    },
    providers::{ProviderError, ValidationSnafu},
};

/// Specifies the corporate action adjustment for stock data.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    #[default]
    Raw,
    Split,
    Dividend,
    All,
}

/// Specifies the source feed for stock data.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    #[default]
    Sip,
    Iex,
    Otc,
}

/// Specifies the sort order for the bars.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    #[default]
    Asc,
    Desc,
}

/// Alpaca-specific parameters for a bars request.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AlpacaBarsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<Adjustment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<Feed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

fn as_query_value<T: Serialize>(value: &T) -> String {
    // Unit variants serialize to plain JSON strings; strip the quotes.
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Checks the timeframe against Alpaca's accepted amount ranges.
pub fn validate_timeframe(tf: &TimeFrame) -> Result<(), ProviderError> {
    let ok = match tf.unit {
        TimeFrameUnit::Minute => (1..=59).contains(&tf.amount),
        TimeFrameUnit::Hour => (1..=23).contains(&tf.amount),
        TimeFrameUnit::Day | TimeFrameUnit::Week => tf.amount == 1,
        TimeFrameUnit::Month => [1, 2, 3, 6, 12].contains(&tf.amount),
    };
    if ok {
        Ok(())
    } else {
        ValidationSnafu {
            message: format!("timeframe {tf} is not supported by Alpaca"),
        }
        .fail()
    }
}

/// Alpaca's stock bars endpoint serves equities only.
pub fn validate_asset_class(asset_class: AssetClass) -> Result<(), ProviderError> {
    match asset_class {
        AssetClass::Equity => Ok(()),
        other => ValidationSnafu {
            message: format!("asset class {other:?} is not served by the Alpaca stocks endpoint"),
        }
        .fail(),
    }
}

/// Builds the query string pairs for one page of a bars request.
pub fn construct_params(params: &BarsRequestParams) -> Vec<(String, String)> {
    let mut query = vec![
        ("symbols".to_string(), params.symbols.join(",")),
        ("timeframe".to_string(), params.timeframe.to_string()),
        ("start".to_string(), params.start.to_rfc3339()),
        ("end".to_string(), params.end.to_rfc3339()),
    ];

    if let ProviderParams::Alpaca(extra) = &params.provider_specific {
        if let Some(adjustment) = &extra.adjustment {
            query.push(("adjustment".to_string(), as_query_value(adjustment)));
        }
        if let Some(feed) = &extra.feed {
            query.push(("feed".to_string(), as_query_value(feed)));
        }
        if let Some(currency) = &extra.currency {
            query.push(("currency".to_string(), currency.clone()));
        }
        if let Some(limit) = extra.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(sort) = &extra.sort {
            query.push(("sort".to_string(), as_query_value(sort)));
        }
    }

    query
}

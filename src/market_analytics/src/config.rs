//! Run configuration: parsing, validation, and loading.
//!
//! ```toml
//! provider = "yahoo"
//! timezone = "Asia/Kolkata"
//! symbols_file = "nifty50.toml"
//!
//! [fetch]
//! lookback_days = 1826
//! concurrency = 4
//! requests_per_minute = 60
//! timeout_secs = 30
//!
//! [metrics]
//! one_year_days = 365
//! two_year_days = 730
//! ma_period = 200
//!
//! [channel]
//! swing_fraction = 0.05
//! horizon_days = 120
//! ```
//!
//! Every key is optional. Symbols come either from `symbols_file` (resolved
//! against the config file's directory) or from inline `[[symbols]]` tables,
//! never both.
//!
//! `provider = "alpaca"` covers US equities only. It cannot serve NSE
//! tickers such as `LT.NS` or indices such as `^NSEI`; use `yahoo` for those.

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::{Path, PathBuf},
    time::Duration as StdDuration,
};

use anyhow::{Context, bail, ensure};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use toml::from_str;

use crate::{
    channel::{ChannelFitter, DEFAULT_HORIZON_DAYS},
    metrics::MetricSettings,
    pipeline::{DEFAULT_LOOKBACK_DAYS, MAX_HORIZON_DAYS, MAX_SPAN_DAYS, PipelineSettings},
    providers::ProviderId,
    swing::{DEFAULT_SWING_FRACTION, SwingDetector},
    symbols::{NormalizationReport, SymbolSpec, SymbolUniverse, load_universe_path, normalize_universe},
    tz::parse_tz,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub provider: ProviderId,
    /// IANA zone of the exchange, used for rendered dates.
    pub timezone: Option<String>,
    pub symbols_file: Option<PathBuf>,
    #[serde(default)]
    pub symbols: Vec<SymbolSpec>,
    #[serde(default)]
    pub fetch: FetchCfg,
    #[serde(default)]
    pub metrics: MetricsCfg,
    #[serde(default)]
    pub channel: ChannelCfg,

    /// Directory of the file this config was read from.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchCfg {
    pub lookback_days: i64,
    pub concurrency: usize,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

impl Default for FetchCfg {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            concurrency: 4,
            requests_per_minute: 60,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsCfg {
    pub one_year_days: i64,
    pub two_year_days: i64,
    pub ma_period: usize,
}

impl Default for MetricsCfg {
    fn default() -> Self {
        Self {
            one_year_days: 365,
            two_year_days: 730,
            ma_period: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelCfg {
    pub swing_fraction: f64,
    pub horizon_days: usize,
}

impl Default for ChannelCfg {
    fn default() -> Self {
        Self {
            swing_fraction: DEFAULT_SWING_FRACTION,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl AnalyticsConfig {
    /// Checks ranges and cross-field rules.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.symbols_file.is_some() && !self.symbols.is_empty() {
            bail!("set either symbols_file or inline [[symbols]], not both");
        }
        if let Some(name) = &self.timezone {
            parse_tz(name)?;
        }

        let f = &self.fetch;
        ensure!(
            (1..=MAX_SPAN_DAYS).contains(&f.lookback_days),
            "fetch.lookback_days must be between 1 and {MAX_SPAN_DAYS}, got {}",
            f.lookback_days
        );
        ensure!(f.concurrency > 0, "fetch.concurrency must be at least 1");
        ensure!(f.requests_per_minute > 0, "fetch.requests_per_minute must be at least 1");
        ensure!(f.timeout_secs > 0, "fetch.timeout_secs must be at least 1");

        let m = &self.metrics;
        for (key, days) in [("one_year_days", m.one_year_days), ("two_year_days", m.two_year_days)] {
            ensure!(
                (1..=MAX_SPAN_DAYS).contains(&days),
                "metrics.{key} must be between 1 and {MAX_SPAN_DAYS}, got {days}"
            );
        }
        ensure!(m.ma_period > 0, "metrics.ma_period must be at least 1");

        let c = &self.channel;
        ensure!(
            c.swing_fraction.is_finite() && c.swing_fraction > 0.0 && c.swing_fraction <= 1.0,
            "channel.swing_fraction must be in (0, 1], got {}",
            c.swing_fraction
        );
        ensure!(
            c.horizon_days <= MAX_HORIZON_DAYS,
            "channel.horizon_days must be at most {MAX_HORIZON_DAYS}, got {}",
            c.horizon_days
        );
        Ok(())
    }

    pub fn requests_per_minute(&self) -> anyhow::Result<NonZeroU32> {
        NonZeroU32::new(self.fetch.requests_per_minute)
            .context("fetch.requests_per_minute must be at least 1")
    }

    /// Converts the validated config into pipeline settings.
    pub fn pipeline_settings(&self) -> anyhow::Result<PipelineSettings> {
        let tz = self.timezone.as_deref().map(parse_tz).transpose()?;
        Ok(PipelineSettings {
            lookback: days("fetch.lookback_days", self.fetch.lookback_days)?,
            concurrency: NonZeroUsize::new(self.fetch.concurrency)
                .context("fetch.concurrency must be at least 1")?,
            fetch_timeout: StdDuration::from_secs(self.fetch.timeout_secs),
            metrics: MetricSettings {
                one_year: days("metrics.one_year_days", self.metrics.one_year_days)?,
                two_year: days("metrics.two_year_days", self.metrics.two_year_days)?,
                ma_period: NonZeroUsize::new(self.metrics.ma_period)
                    .context("metrics.ma_period must be at least 1")?,
            },
            detector: SwingDetector::new(self.channel.swing_fraction),
            fitter: ChannelFitter::new(self.channel.horizon_days),
            tz,
        })
    }

    /// Loads the symbol universe from `symbols_file` or the inline list.
    pub fn universe(&self) -> anyhow::Result<(SymbolUniverse, NormalizationReport)> {
        match &self.symbols_file {
            Some(file) => {
                let path = match &self.base_dir {
                    Some(base) if file.is_relative() => base.join(file),
                    _ => file.clone(),
                };
                load_universe_path(&path)
            }
            None => {
                let mut universe = SymbolUniverse {
                    symbols: self.symbols.clone(),
                };
                let report = normalize_universe(&mut universe)?;
                Ok((universe, report))
            }
        }
    }
}

fn days(key: &str, n: i64) -> anyhow::Result<Duration> {
    Duration::try_days(n).with_context(|| format!("{key} = {n} is out of range"))
}

/// Parses and validates a config from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AnalyticsConfig> {
    let cfg: AnalyticsConfig = from_str(toml_str).context("failed to parse analytics config TOML")?;
    cfg.validate().context("invalid analytics config")?;
    Ok(cfg)
}

/// Reads a config TOML file from disk, parses, and validates it.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<AnalyticsConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let mut cfg = load_config_str(&text)?;
    cfg.base_dir = path.parent().map(Path::to_path_buf);
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg.provider, ProviderId::Yahoo);
        let settings = cfg.pipeline_settings().unwrap();
        assert_eq!(settings.lookback, Duration::days(1826));
        assert_eq!(settings.concurrency.get(), 4);
        assert_eq!(settings.metrics.ma_period.get(), 200);
        assert_eq!(settings.fitter.horizon_days, 120);
        assert_eq!(settings.detector.fraction(), 0.05);
        assert!(settings.tz.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = load_config_str(
            r#"
            provider = "alpaca"
            timezone = "America/New_York"
            [fetch]
            concurrency = 8
            [channel]
            horizon_days = 30
        "#,
        )
        .unwrap();
        assert_eq!(cfg.provider, ProviderId::Alpaca);
        assert_eq!(cfg.fetch.concurrency, 8);
        assert_eq!(cfg.fetch.requests_per_minute, 60);
        let settings = cfg.pipeline_settings().unwrap();
        assert_eq!(settings.fitter.horizon_days, 30);
        assert_eq!(settings.tz, Some(chrono_tz::America::New_York));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(load_config_str("provder = \"yahoo\"").is_err());
        assert!(load_config_str("[fetch]\nconcurrency = 0").is_err());
        assert!(load_config_str("[channel]\nswing_fraction = 1.5").is_err());
        assert!(load_config_str("timezone = \"Nowhere/City\"").is_err());
        assert!(load_config_str("provider = \"polygon\"").is_err());
    }

    #[test]
    fn rejects_spans_past_a_century() {
        let err = load_config_str("[fetch]\nlookback_days = 100000000").unwrap_err();
        assert!(format!("{err:#}").contains("fetch.lookback_days"));
        assert!(load_config_str("[metrics]\ntwo_year_days = 36501").is_err());
        assert!(load_config_str("[metrics]\none_year_days = -1").is_err());
        assert!(load_config_str("[channel]\nhorizon_days = 1000000").is_err());
        assert!(load_config_str("[fetch]\nlookback_days = 36500").is_ok());
    }

    #[test]
    fn unvalidated_huge_span_is_an_error_not_a_panic() {
        let mut cfg = AnalyticsConfig::default();
        cfg.fetch.lookback_days = i64::MAX;
        assert!(cfg.pipeline_settings().is_err());
    }

    #[test]
    fn inline_symbols_are_normalized() {
        let cfg = load_config_str(
            r#"
            [[symbols]]
            name = "TCS"
            ticker = "tcs.ns"
            [[symbols]]
            name = "TCS again"
            ticker = "TCS.NS"
        "#,
        )
        .unwrap();
        let (universe, report) = cfg.universe().unwrap();
        assert_eq!(universe.symbols.len(), 1);
        assert_eq!(universe.symbols[0].ticker, "TCS.NS");
        assert_eq!(report.duplicates_dropped, ["TCS.NS"]);
    }

    #[test]
    fn file_and_inline_symbols_conflict() {
        let err = load_config_str(
            r#"
            symbols_file = "nifty50.toml"
            [[symbols]]
            name = "TCS"
            ticker = "TCS.NS"
        "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("not both"));
    }
}

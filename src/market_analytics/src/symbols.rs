//! Symbol universe: parsing, normalization, and loading.
//!
//! A universe file lists the instruments a run covers:
//!
//! ```toml
//! [[symbols]]
//! name = "Larsen & Toubro"
//! industry = "Construction"
//! ticker = "LT.NS"
//! ```
//!
//! Normalization trims every field, upper-cases tickers, and drops repeated
//! tickers while preserving the first occurrence. Rows are processed in the
//! order they appear in the file.

use std::collections::HashSet;

use anyhow::{Context, bail};
use market_data_ingestor::models::asset::AssetClass;
use serde::{Deserialize, Serialize};
use toml::from_str;

/// One instrument of the universe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolSpec {
    /// Display name used in the metrics table.
    pub name: String,
    #[serde(default)]
    pub industry: String,
    /// Provider ticker, e.g. "RELIANCE.NS" or "^NSEI".
    pub ticker: String,
    #[serde(default)]
    pub asset_class: AssetClass,
}

impl SymbolSpec {
    pub fn new(name: impl Into<String>, industry: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            industry: industry.into(),
            ticker: ticker.into(),
            asset_class: AssetClass::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolUniverse {
    #[serde(default)]
    pub symbols: Vec<SymbolSpec>,
}

/// What [`normalize_universe`] changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Tickers whose spelling changed after trimming and upper-casing.
    pub tickers_rewritten: usize,
    /// Tickers dropped because an earlier row already listed them.
    pub duplicates_dropped: Vec<String>,
}

impl NormalizationReport {
    pub fn is_clean(&self) -> bool {
        self.tickers_rewritten == 0 && self.duplicates_dropped.is_empty()
    }
}

/// Normalizes `universe` in place.
///
/// Errors:
/// - Empty ticker after trimming
/// - Empty name after trimming
pub fn normalize_universe(universe: &mut SymbolUniverse) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(universe.symbols.len());

    for mut spec in std::mem::take(&mut universe.symbols) {
        let ticker = spec.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            bail!("ticker cannot be empty (name: '{}')", spec.name.trim());
        }
        if ticker != spec.ticker {
            report.tickers_rewritten += 1;
        }
        spec.ticker = ticker;

        spec.name = spec.name.trim().to_string();
        if spec.name.is_empty() {
            bail!("name cannot be empty for ticker {}", spec.ticker);
        }
        spec.industry = spec.industry.trim().to_string();

        if seen.insert(spec.ticker.clone()) {
            out.push(spec);
        } else {
            report.duplicates_dropped.push(spec.ticker);
        }
    }

    universe.symbols = out;
    Ok(report)
}

/// Parses and normalizes a universe from a TOML string.
pub fn load_universe_str(toml_str: &str) -> anyhow::Result<(SymbolUniverse, NormalizationReport)> {
    let mut universe: SymbolUniverse = from_str(toml_str).context("failed to parse symbol universe TOML")?;
    let report = normalize_universe(&mut universe).context("normalize_universe failed")?;
    Ok((universe, report))
}

/// Reads a universe TOML file from disk, parses, and normalizes it.
pub fn load_universe_path(
    path: impl AsRef<std::path::Path>,
) -> anyhow::Result<(SymbolUniverse, NormalizationReport)> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read symbol universe {}", path.as_ref().display()))?;
    load_universe_str(&text)
}

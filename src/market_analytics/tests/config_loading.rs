use std::fs;

use market_analytics::{config::load_config_path, providers::ProviderId};
use tempfile::tempdir;

const UNIVERSE: &str = r#"
[[symbols]]
name = "Larsen & Toubro"
industry = "Construction"
ticker = "LT.NS"

[[symbols]]
name = "Mahindra & Mahindra"
industry = "Automobile"
ticker = "m&m.ns"

[[symbols]]
name = "Larsen & Toubro"
industry = "Construction"
ticker = "LT.NS"
"#;

#[test]
fn symbols_file_resolves_next_to_config() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("universe.toml"), UNIVERSE).unwrap();
    let config_path = dir.path().join("run.toml");
    fs::write(
        &config_path,
        r#"
        provider = "yahoo"
        timezone = "Asia/Kolkata"
        symbols_file = "universe.toml"

        [fetch]
        requests_per_minute = 30
        "#,
    )
    .unwrap();

    let cfg = load_config_path(&config_path).unwrap();
    assert_eq!(cfg.provider, ProviderId::Yahoo);
    assert_eq!(cfg.requests_per_minute().unwrap().get(), 30);

    let (universe, report) = cfg.universe().unwrap();
    let tickers: Vec<_> = universe.symbols.iter().map(|s| s.ticker.as_str()).collect();
    assert_eq!(tickers, ["LT.NS", "M&M.NS"]);
    assert_eq!(report.duplicates_dropped, ["LT.NS"]);
    assert_eq!(report.tickers_rewritten, 1);
}

#[test]
fn missing_symbols_file_is_reported_with_path() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("run.toml");
    fs::write(&config_path, "symbols_file = \"missing.toml\"").unwrap();

    let cfg = load_config_path(&config_path).unwrap();
    let err = cfg.universe().unwrap_err();
    assert!(format!("{err:#}").contains("missing.toml"));
}

#[test]
fn missing_config_file_is_error() {
    let dir = tempdir().unwrap();
    let err = load_config_path(dir.path().join("nope.toml")).unwrap_err();
    assert!(err.to_string().contains("nope.toml"));
}

#[test]
fn shipped_configs_load() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs");
    let cfg = load_config_path(root.join("market_analytics.toml")).unwrap();
    let (universe, report) = cfg.universe().unwrap();
    assert_eq!(universe.symbols.len(), 49);
    assert_eq!(report.duplicates_dropped, ["LT.NS"]);
    assert!(cfg.pipeline_settings().unwrap().tz.is_some());
}

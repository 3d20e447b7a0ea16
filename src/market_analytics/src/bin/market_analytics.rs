use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use market_analytics::{
    config::{AnalyticsConfig, load_config_path},
    pipeline::build_pipeline,
    providers::build_provider,
    symbols::SymbolSpec,
    table::{Column, SortOrder},
    tz::parse_ts_to_utc,
};
use shared_utils::env::get_env_var_opt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "MARKET_ANALYTICS_CONFIG";

#[derive(Parser)]
#[command(version, about = "Deviation metrics and trend channels for daily bars")]
struct Cli {
    /// Path to the run config (falls back to $MARKET_ANALYTICS_CONFIG, then defaults)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct AsOf {
    /// End of the lookback, RFC-3339 with offset (default: now)
    #[arg(long, value_parser = parse_ts_to_utc)]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the metrics table and the symbols that were left out
    Metrics {
        /// Column label or key to sort by, e.g. "1Y High % Diff" or high_1y
        #[arg(long, default_value = "name")]
        sort: Column,
        #[arg(long, default_value = "asc")]
        order: SortOrder,
        /// Also write the full batch (rows, channels, exclusions) as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
        #[command(flatten)]
        as_of: AsOf,
    },
    /// Print channel lines and projections for one ticker as JSON
    Channel {
        #[arg(long)]
        ticker: String,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        #[command(flatten)]
        as_of: AsOf,
    },
    /// Validate and print the normalized symbol universe
    Symbols,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AnalyticsConfig> {
    match path.or_else(|| get_env_var_opt(CONFIG_ENV).map(PathBuf::from)) {
        Some(path) => load_config_path(&path),
        None => {
            info!("no config given, using defaults");
            Ok(AnalyticsConfig::default())
        }
    }
}

fn write_json<T: serde::Serialize>(value: &T, out: Option<&PathBuf>) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), "wrote json");
        }
        None => println!("{text}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let cfg = load_config(cli.config)?;
    let (universe, report) = cfg.universe()?;
    if !report.is_clean() {
        warn!(
            rewritten = report.tickers_rewritten,
            duplicates = ?report.duplicates_dropped,
            "symbol universe normalized"
        );
    }

    match cli.cmd {
        Cmd::Symbols => {
            for s in &universe.symbols {
                println!("{}\t{}\t{}", s.ticker, s.name, s.industry);
            }
        }
        Cmd::Metrics {
            sort,
            order,
            json,
            as_of,
        } => {
            if universe.symbols.is_empty() {
                bail!("symbol universe is empty");
            }
            let settings = cfg.pipeline_settings()?;
            let provider = build_provider(cfg.provider, cfg.requests_per_minute()?)?;
            let as_of = as_of.as_of.unwrap_or_else(Utc::now);

            let batch = build_pipeline(provider.as_ref(), &universe.symbols, &settings, as_of).await?;
            let mut table = batch.metrics_table();
            table.sort_by(sort, order);
            print!("{}", table.render());

            if !batch.exclusions.is_empty() {
                println!("\nStocks Not Fetched:");
                for exclusion in &batch.exclusions {
                    println!("{exclusion}");
                }
            }
            if let Some(path) = json {
                write_json(&batch, Some(&path))?;
            }
        }
        Cmd::Channel { ticker, out, as_of } => {
            let ticker = ticker.trim().to_uppercase();
            let spec = universe
                .symbols
                .iter()
                .find(|s| s.ticker == ticker)
                .cloned()
                .unwrap_or_else(|| SymbolSpec::new(ticker.as_str(), "", ticker.as_str()));

            let settings = cfg.pipeline_settings()?;
            let provider = build_provider(cfg.provider, cfg.requests_per_minute()?)?;
            let as_of = as_of.as_of.unwrap_or_else(Utc::now);

            let batch = build_pipeline(provider.as_ref(), std::slice::from_ref(&spec), &settings, as_of).await?;
            if let Some(exclusion) = batch.exclusions.first() {
                bail!("{exclusion}");
            }
            let analysis = batch
                .channel(&ticker)
                .with_context(|| format!("no channel produced for {ticker}"))?;
            write_json(analysis, out.as_ref())?;
        }
    }

    Ok(())
}

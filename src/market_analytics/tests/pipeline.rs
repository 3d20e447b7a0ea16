mod common;

use std::time::Duration as StdDuration;

use common::{MockProvider, Scripted, as_of, trending_bars};
use governor::Quota;
use market_analytics::{
    pipeline::{PipelineSettings, build_pipeline},
    symbols::SymbolSpec,
    table::{Column, SortOrder},
};
use market_data_ingestor::providers::rate_limited::RateLimitedProvider;

fn universe() -> Vec<SymbolSpec> {
    vec![
        SymbolSpec::new("Larsen & Toubro", "Construction", "LT.NS"),
        SymbolSpec::new("Nifty 50", "Index", "^NSEI"),
        SymbolSpec::new("Delisted Co", "Misc", "GONE.NS"),
        SymbolSpec::new("Infosys", "IT", "INFY.NS"),
        SymbolSpec::new("Slow Co", "Misc", "SLOW.NS"),
        SymbolSpec::new("Unknown Co", "Misc", "NONE.NS"),
    ]
}

fn provider() -> MockProvider {
    MockProvider::default()
        .with("LT.NS", Scripted::Bars(trending_bars(1_250, 10_000.0)))
        // index volume comes back empty from the chart endpoint
        .with("^NSEI", Scripted::Bars(trending_bars(1_250, 0.0)))
        .with("GONE.NS", Scripted::Fail("No data found, symbol may be delisted".into()))
        .with("INFY.NS", Scripted::Bars(trending_bars(150, 5_000.0)))
        .with("SLOW.NS", Scripted::Hang)
        .with("NONE.NS", Scripted::Nothing)
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        fetch_timeout: StdDuration::from_millis(200),
        ..PipelineSettings::default()
    }
}

#[tokio::test]
async fn batch_completes_with_rows_and_exclusions() {
    let batch = build_pipeline(&provider(), &universe(), &settings(), as_of())
        .await
        .unwrap();

    let analysed: Vec<_> = batch.reports.iter().map(|r| r.row.ticker.as_str()).collect();
    assert_eq!(analysed, ["LT.NS", "INFY.NS"]);

    let excluded: Vec<_> = batch
        .exclusions
        .iter()
        .map(|e| (e.ticker.as_str(), e.kind))
        .collect();
    assert_eq!(
        excluded,
        [
            ("^NSEI", "empty_series"),
            ("GONE.NS", "fetch_failure"),
            ("SLOW.NS", "fetch_failure"),
            ("NONE.NS", "empty_series"),
        ]
    );

    let gone = &batch.exclusions[1];
    assert_eq!(gone.name, "Delisted Co");
    assert!(gone.to_string().starts_with("GONE.NS: "));
    assert!(gone.reason.contains("delisted"));
    assert!(batch.exclusions[2].reason.contains("timed out"));
}

#[tokio::test]
async fn rows_carry_metrics_and_channels() {
    let batch = build_pipeline(&provider(), &universe(), &settings(), as_of())
        .await
        .unwrap();

    let lt = &batch.reports[0];
    // 1,250 daily bars fit inside the 1,826 day lookback
    assert_eq!(lt.channel.bars.len(), 1_250);
    assert_eq!(lt.channel.window, 62);
    assert_eq!(lt.channel.projection.len(), 120);
    assert!(lt.channel.channel.upper.slope > 0.0);
    assert!(lt.row.metrics.ma.is_some());
    assert!(lt.row.metrics.high_5y.pct <= 0.0);
    assert!(lt.row.metrics.low_5y.pct >= 0.0);

    // 150 bars: too short for a 200-bar average, still reported
    let infy = &batch.reports[1];
    assert!(infy.row.metrics.ma.is_none());
    assert_eq!(infy.channel.window, 7);

    assert!(batch.channel("lt.ns").is_some());
    assert!(batch.channel("GONE.NS").is_none());
}

#[tokio::test]
async fn table_sorts_and_renders() {
    let batch = build_pipeline(&provider(), &universe(), &settings(), as_of())
        .await
        .unwrap();

    let mut table = batch.metrics_table();
    table.sort_by(Column::MovingAverage, SortOrder::Descending);
    // INFY has no moving average and sorts last
    assert_eq!(table.rows()[1].ticker, "INFY.NS");

    let text = table.render();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("Larsen & Toubro"));
}

#[tokio::test]
async fn serial_and_parallel_runs_agree() {
    let serial = PipelineSettings {
        concurrency: std::num::NonZeroUsize::MIN,
        ..settings()
    };
    let a = build_pipeline(&provider(), &universe(), &serial, as_of()).await.unwrap();
    let b = build_pipeline(&provider(), &universe(), &settings(), as_of()).await.unwrap();

    assert_eq!(a.exclusions, b.exclusions);
    assert_eq!(a.metrics_table(), b.metrics_table());
}

#[tokio::test]
async fn empty_universe_is_an_empty_batch() {
    let batch = build_pipeline(&provider(), &[], &settings(), as_of()).await.unwrap();
    assert!(batch.reports.is_empty());
    assert!(batch.exclusions.is_empty());
}

#[tokio::test]
async fn invalid_settings_fail_the_call() {
    let bad = PipelineSettings {
        fetch_timeout: StdDuration::ZERO,
        ..PipelineSettings::default()
    };
    assert!(build_pipeline(&provider(), &universe(), &bad, as_of()).await.is_err());
}

#[tokio::test]
async fn throttle_wait_does_not_count_against_the_timeout() {
    let symbols = [
        SymbolSpec::new("A Co", "Misc", "A.NS"),
        SymbolSpec::new("B Co", "Misc", "B.NS"),
        SymbolSpec::new("C Co", "Misc", "C.NS"),
    ];
    let mock = symbols.iter().fold(MockProvider::default(), |mock, s| {
        mock.with(&s.ticker, Scripted::Bars(trending_bars(300, 1_000.0)))
    });
    // one request per 400ms: the third symbol waits 800ms for its slot
    let quota = Quota::with_period(StdDuration::from_millis(400)).unwrap();
    let provider = RateLimitedProvider::new(mock, quota);
    let settings = PipelineSettings {
        fetch_timeout: StdDuration::from_millis(300),
        ..PipelineSettings::default()
    };

    let batch = build_pipeline(&provider, &symbols, &settings, as_of()).await.unwrap();

    assert!(batch.exclusions.is_empty(), "{:?}", batch.exclusions);
    assert_eq!(batch.reports.len(), 3);
}

#[tokio::test]
async fn zero_low_excludes_only_that_symbol() {
    let mut broken = trending_bars(300, 1_000.0);
    broken[120].low = 0.0;
    let symbols = [
        SymbolSpec::new("Broken Co", "Misc", "ZERO.NS"),
        SymbolSpec::new("Infosys", "IT", "INFY.NS"),
    ];
    let provider = MockProvider::default()
        .with("ZERO.NS", Scripted::Bars(broken))
        .with("INFY.NS", Scripted::Bars(trending_bars(300, 5_000.0)));

    let batch = build_pipeline(&provider, &symbols, &settings(), as_of()).await.unwrap();

    assert_eq!(batch.exclusions.len(), 1);
    assert_eq!(batch.exclusions[0].ticker, "ZERO.NS");
    assert_eq!(batch.exclusions[0].kind, "division_by_zero");
    let analysed: Vec<_> = batch.reports.iter().map(|r| r.row.ticker.as_str()).collect();
    assert_eq!(analysed, ["INFY.NS"]);
}

//! Integration tests for the scan pipeline.
//!
//! Drives the batch scanner and the service against in-memory repositories
//! to check batch isolation, result ordering, and progress reporting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use screener_common::config::Config;
use weekly_screener::data::{Lookback, ProviderError, RawBar, SeriesBatch, SeriesRepository, Timeframe};
use weekly_screener::screener::{
    BatchScanner, CardRenderer, NoProgress, ReportFormat, ScanConfig, ScanError,
};
use weekly_screener::strategy::{
    MatchDetail, ReversalParams, StrategyKind, StrategyParams, TrendParams,
};
use weekly_screener::universe::{Market, TickerUniverse};
use weekly_screener::ScreenerService;

// ============================================================================
// Fixtures
// ============================================================================

fn bars(closes: &[f64]) -> Vec<RawBar> {
    let start = Utc.with_ymd_and_hms(2019, 1, 7, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| RawBar {
            timestamp: start + Duration::weeks(i as i64),
            open: Some(c),
            high: Some(c),
            low: Some(c),
            close: Some(c),
        })
        .collect()
}

fn ramp(from: f64, to: f64, steps: usize) -> Vec<f64> {
    (1..=steps)
        .map(|i| from + (to - from) * i as f64 / steps as f64)
        .collect()
}

/// Steady climb: matches the trend strategy.
fn rising() -> Vec<f64> {
    (0..80).map(|i| 100.0 + i as f64).collect()
}

/// Long fall then a rebound off the low: matches the reversal strategy.
fn bottom_out() -> Vec<f64> {
    let mut closes = vec![1000.0; 100];
    closes.extend(ramp(1000.0, 400.0, 131));
    closes.extend(ramp(400.0, 450.0, 29));
    closes
}

fn universe(n: usize) -> TickerUniverse {
    (0..n)
        .map(|i| (format!("S{:02}", i), format!("Stock {}", i)))
        .collect()
}

// ============================================================================
// Mock Repositories
// ============================================================================

/// Serves fixed closes per symbol; one batch (1-based) can be made to fail.
struct MockRepository {
    closes: HashMap<String, Vec<f64>>,
    default_closes: Option<Vec<f64>>,
    fail_batch: Option<u32>,
    calls: AtomicU32,
    requested: Mutex<Vec<Vec<String>>>,
}

impl MockRepository {
    fn new(default_closes: Option<Vec<f64>>) -> Self {
        Self {
            closes: HashMap::new(),
            default_closes,
            fail_batch: None,
            calls: AtomicU32::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn with_series(mut self, symbol: &str, closes: Vec<f64>) -> Self {
        self.closes.insert(symbol.to_string(), closes);
        self
    }

    fn failing_batch(mut self, batch: u32) -> Self {
        self.fail_batch = Some(batch);
        self
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn requested(&self) -> Vec<Vec<String>> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl SeriesRepository for MockRepository {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch(
        &self,
        symbols: &[String],
        _lookback: Lookback,
        interval: Timeframe,
    ) -> Result<SeriesBatch, ProviderError> {
        assert_eq!(interval, Timeframe::Weekly);

        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requested.lock().unwrap().push(symbols.to_vec());

        if self.fail_batch == Some(call) {
            return Err(ProviderError::Network("connection reset".into()));
        }

        Ok(symbols
            .iter()
            .filter_map(|s| {
                self.closes
                    .get(s)
                    .or(self.default_closes.as_ref())
                    .map(|c| (s.clone(), bars(c)))
            })
            .collect())
    }
}

fn trend_scan(batch_size: usize) -> ScanConfig {
    ScanConfig {
        params: StrategyParams::Trend(TrendParams::default()),
        batch_size,
        ..ScanConfig::default()
    }
}

// ============================================================================
// Batch Isolation
// ============================================================================

#[tokio::test]
async fn test_failed_batch_does_not_stop_scan() {
    let repo = Arc::new(MockRepository::new(Some(rising())).failing_batch(2));
    let scanner = BatchScanner::new(trend_scan(2), Arc::clone(&repo)).unwrap();

    let mut progress = Vec::new();
    let report = scanner
        .run(&universe(10), &mut |done: usize, total: usize| {
            progress.push((done, total))
        })
        .await
        .unwrap();

    assert_eq!(repo.call_count(), 5);
    assert_eq!(report.stats.batches_total, 5);
    assert_eq!(report.stats.batches_failed, 1);
    assert_eq!(
        report.results.tickers(),
        vec!["S00", "S01", "S04", "S05", "S06", "S07", "S08", "S09"]
    );
    assert_eq!(progress, vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
}

#[tokio::test]
async fn test_batches_follow_universe_order() {
    let repo = Arc::new(MockRepository::new(Some(rising())));
    let scanner = BatchScanner::new(trend_scan(3), Arc::clone(&repo)).unwrap();

    scanner.run(&universe(7), &mut NoProgress).await.unwrap();

    let requested = repo.requested();
    assert_eq!(requested.len(), 3);
    assert_eq!(requested[0], vec!["S00", "S01", "S02"]);
    assert_eq!(requested[2], vec!["S06"]);
}

#[tokio::test]
async fn test_every_batch_failing_still_reports() {
    struct DownRepository;

    #[async_trait]
    impl SeriesRepository for DownRepository {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn fetch(
            &self,
            _symbols: &[String],
            _lookback: Lookback,
            _interval: Timeframe,
        ) -> Result<SeriesBatch, ProviderError> {
            Err(ProviderError::Unavailable("HTTP 503".into()))
        }
    }

    let scanner = BatchScanner::new(trend_scan(4), Arc::new(DownRepository)).unwrap();
    let report = scanner.run(&universe(9), &mut NoProgress).await.unwrap();

    assert!(report.results.is_empty());
    assert_eq!(report.stats.batches_failed, 3);
    assert_eq!(report.stats.symbols_evaluated, 0);
}

#[tokio::test]
async fn test_empty_universe_is_an_error() {
    let repo = Arc::new(MockRepository::new(Some(rising())));
    let scanner = BatchScanner::new(trend_scan(20), Arc::clone(&repo)).unwrap();

    let result = scanner.run(&TickerUniverse::new(), &mut NoProgress).await;

    assert!(matches!(result, Err(ScanError::EmptyUniverse)));
    assert_eq!(repo.call_count(), 0);
}

// ============================================================================
// Symbol Classification
// ============================================================================

#[tokio::test]
async fn test_bad_symbols_are_counted_not_fatal() {
    let repo = Arc::new(
        MockRepository::new(None)
            .with_series("GOOD", rising())
            .with_series("SHORT", rising()[..30].to_vec())
            .with_series("FLAT", vec![100.0; 80]),
    );
    let scanner = BatchScanner::new(trend_scan(20), repo).unwrap();
    let universe: TickerUniverse = vec![
        ("GOOD", "Good Co"),
        ("MISSING", "Gone Co"),
        ("SHORT", "New Co"),
        ("FLAT", "Flat Co"),
    ]
    .into_iter()
    .collect();

    let report = scanner.run(&universe, &mut NoProgress).await.unwrap();

    assert_eq!(report.results.tickers(), vec!["GOOD"]);
    assert_eq!(report.stats.symbols_requested, 4);
    assert_eq!(report.stats.symbols_invalid, 1);
    assert_eq!(report.stats.insufficient_history, 1);
    assert_eq!(report.stats.not_matched, 1);
    assert_eq!(report.stats.matched, 1);
}

#[tokio::test]
async fn test_reversal_scan_finds_bottom_out() {
    let repo = Arc::new(
        MockRepository::new(None)
            .with_series("7974.T", bottom_out())
            .with_series("9984.T", rising()),
    );
    let config = ScanConfig {
        params: StrategyParams::Reversal(ReversalParams::default()),
        ..ScanConfig::default()
    };
    let scanner = BatchScanner::new(config, repo).unwrap();
    let universe: TickerUniverse = vec![("7974.T", "任天堂"), ("9984.T", "ソフトバンクG")]
        .into_iter()
        .collect();

    let report = scanner.run(&universe, &mut NoProgress).await.unwrap();

    assert_eq!(report.strategy, StrategyKind::Reversal);
    assert_eq!(report.results.len(), 1);

    let hit = report.results.get("7974.T").unwrap();
    assert_eq!(hit.display_name, "任天堂");
    assert!((hit.current_price - 450.0).abs() < 1e-9);
    match &hit.detail {
        MatchDetail::Reversal {
            drop_ratio,
            recover_ratio,
            ..
        } => {
            assert!((drop_ratio - 0.55).abs() < 1e-9);
            assert!((recover_ratio - 0.125).abs() < 1e-9);
        }
        other => panic!("unexpected detail: {:?}", other),
    }
}

// ============================================================================
// Service and Rendering
// ============================================================================

#[tokio::test]
async fn test_service_scans_cached_universe() {
    let mut config = Config::default();
    config.screener.strategy = "trend".into();

    let repo = Arc::new(MockRepository::new(Some(rising())));
    let service = ScreenerService::with_repository(config.clone(), repo.clone());
    service
        .universes()
        .insert(
            Market::TsePrime,
            vec![("7974.T", "任天堂"), ("6758.T", "ソニーG"), ("4385.T", "")]
                .into_iter()
                .collect(),
        )
        .await;

    let scan = ScanConfig::from_config(&config).unwrap();
    assert_eq!(scan.market, Market::TsePrime);

    let mut batches = 0;
    let report = service
        .scan(scan, &mut |_done: usize, _total: usize| batches += 1)
        .await
        .unwrap();

    assert_eq!(report.results.tickers(), vec!["7974.T", "6758.T", "4385.T"]);
    assert_eq!(report.results.get("4385.T").unwrap().display_name, "4385.T");
    assert_eq!(batches, 1);
    assert_eq!(repo.call_count(), 1);
}

#[tokio::test]
async fn test_report_renders_cards() {
    let repo = Arc::new(MockRepository::new(Some(rising())));
    let scanner = BatchScanner::new(trend_scan(20), repo).unwrap();
    let report = scanner.run(&universe(4), &mut NoProgress).await.unwrap();

    let markdown = CardRenderer::new(ReportFormat::Markdown, 2)
        .unwrap()
        .render(&report)
        .unwrap();
    assert!(markdown.contains("Stock 0"));
    assert!(markdown.contains("Stock 3"));

    let json = CardRenderer::new(ReportFormat::Json, 3)
        .unwrap()
        .render(&report)
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["results"].as_array().map(|a| a.len()), Some(4));
}

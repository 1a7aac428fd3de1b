//! Scan results and run statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::PriceSeries;
use crate::indicators::IndicatorSet;
use crate::strategy::{MatchDetail, Metric, SkipReason, StrategyKind};
use crate::universe::Market;

// ============================================================================
// Scan Result
// ============================================================================

/// One matched ticker, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Symbol as scanned (e.g., "7203.T")
    pub ticker: String,
    /// Name from the universe, or the symbol when unknown
    pub display_name: String,
    pub strategy: StrategyKind,
    pub current_price: f64,
    pub detail: MatchDetail,
    /// Labelled figures derived from `detail`
    pub metrics: Vec<Metric>,
    pub series: PriceSeries,
    pub indicators: IndicatorSet,
}

impl ScanResult {
    pub fn new(
        ticker: impl Into<String>,
        display_name: impl Into<String>,
        current_price: f64,
        detail: MatchDetail,
        series: PriceSeries,
        indicators: IndicatorSet,
    ) -> Self {
        let metrics = detail.metrics();
        Self {
            ticker: ticker.into(),
            display_name: display_name.into(),
            strategy: detail.kind(),
            current_price,
            detail,
            metrics,
            series,
            indicators,
        }
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Matches in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ScanResults {
    results: Vec<ScanResult>,
}

impl ScanResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ScanResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScanResult> {
        self.results.iter()
    }

    /// Result for a ticker, if it matched.
    pub fn get(&self, ticker: &str) -> Option<&ScanResult> {
        self.results.iter().find(|r| r.ticker == ticker)
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.ticker.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ScanResults {
    type Item = &'a ScanResult;
    type IntoIter = std::slice::Iter<'a, ScanResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub batches_total: usize,
    /// Batches whose fetch failed or came back empty
    pub batches_failed: usize,
    pub symbols_requested: usize,
    /// Symbols that reached a strategy
    pub symbols_evaluated: usize,
    pub symbols_invalid: usize,
    pub insufficient_history: usize,
    pub degenerate_metric: usize,
    pub not_matched: usize,
    pub matched: usize,
}

impl ScanStats {
    /// Count one skipped symbol.
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::SymbolDataInvalid => self.symbols_invalid += 1,
            SkipReason::InsufficientHistory => self.insufficient_history += 1,
            SkipReason::DegenerateMetric => self.degenerate_metric += 1,
            SkipReason::ConditionsNotMet => self.not_matched += 1,
        }
    }

    /// Symbols skipped because of missing or unusable data.
    pub fn data_problems(&self) -> usize {
        self.symbols_invalid + self.insufficient_history + self.degenerate_metric
    }
}

// ============================================================================
// Report
// ============================================================================

/// Outcome of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Scan ID (timestamp-based)
    pub id: String,
    pub strategy: StrategyKind,
    pub market: Market,
    pub results: ScanResults,
    pub stats: ScanStats,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl ScanReport {
    /// Summary string for logging.
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} symbols in {:.1}s: {} matched, {} no-match, {} skipped, {}/{} batches failed",
            self.stats.symbols_requested,
            self.duration_secs,
            self.stats.matched,
            self.stats.not_matched,
            self.stats.data_problems(),
            self.stats.batches_failed,
            self.stats.batches_total
        )
    }
}

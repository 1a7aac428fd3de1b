//! Batch scanner.
//!
//! Walks the (capped) universe in fixed-size batches. Each batch is one
//! repository fetch; every symbol in it is cleaned and evaluated in batch
//! order. A failed batch or a bad symbol is counted and skipped, never
//! fatal. The progress sink hears about every batch, failed ones included.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::data::{PriceSeries, SeriesBatch, SeriesRepository};
use crate::strategy::{build_strategy, Evaluation, ScreeningStrategy, SkipReason};
use crate::universe::TickerUniverse;

use super::config::{ScanConfig, ScanError};
use super::result::{ScanReport, ScanResult, ScanResults, ScanStats};

// ============================================================================
// Progress
// ============================================================================

/// Receives `(batches_done, batches_total)` after each batch.
pub trait ProgressSink: Send {
    fn on_batch_complete(&mut self, done: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: FnMut(usize, usize) + Send,
{
    fn on_batch_complete(&mut self, done: usize, total: usize) {
        self(done, total)
    }
}

/// Sink that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_batch_complete(&mut self, _done: usize, _total: usize) {}
}

// ============================================================================
// Batch Scanner
// ============================================================================

/// Runs one strategy over a universe, batch by batch.
pub struct BatchScanner<R: SeriesRepository + ?Sized> {
    config: ScanConfig,
    repository: Arc<R>,
    strategy: Box<dyn ScreeningStrategy>,
}

impl<R: SeriesRepository + ?Sized> BatchScanner<R> {
    /// Create a scanner; rejects an invalid configuration.
    pub fn new(config: ScanConfig, repository: Arc<R>) -> Result<Self, ScanError> {
        config.validate()?;
        let strategy = build_strategy(&config.params);

        Ok(Self {
            config,
            repository,
            strategy,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan the head of `universe` and collect matches in scan order.
    pub async fn run(
        &self,
        universe: &TickerUniverse,
        progress: &mut dyn ProgressSink,
    ) -> Result<ScanReport, ScanError> {
        if universe.is_empty() {
            return Err(ScanError::EmptyUniverse);
        }

        let started_at = Utc::now();
        let id = format!("scan_{}", started_at.format("%Y%m%d_%H%M%S"));

        let targets = universe.head(self.config.max_tickers);
        let total = self.config.batch_count(targets.len());

        let mut results = ScanResults::new();
        let mut stats = ScanStats {
            batches_total: total,
            symbols_requested: targets.len(),
            ..ScanStats::default()
        };

        info!(
            scan_id = %id,
            repository = self.repository.name(),
            strategy = %self.config.strategy(),
            symbols = targets.len(),
            batches = total,
            "Starting scan"
        );

        for (i, batch) in targets.chunks(self.config.batch_size).enumerate() {
            let fetched = self
                .repository
                .fetch(batch, self.config.lookback, self.config.interval)
                .await;

            match fetched {
                Ok(series) if !series.is_empty() => {
                    self.evaluate_batch(batch, series, universe, &mut results, &mut stats);
                }
                Ok(_) => {
                    warn!(batch = i + 1, first = %batch[0], "Batch returned no data, skipping");
                    stats.batches_failed += 1;
                }
                Err(e) => {
                    warn!(batch = i + 1, first = %batch[0], error = %e, "Batch fetch failed, skipping");
                    stats.batches_failed += 1;
                }
            }

            debug!(
                batch = i + 1,
                total,
                matched = results.len(),
                "Batch complete"
            );
            progress.on_batch_complete(i + 1, total);
        }

        let completed_at = Utc::now();
        let duration_secs = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let report = ScanReport {
            id,
            strategy: self.config.strategy(),
            market: self.config.market,
            results,
            stats,
            started_at,
            completed_at,
            duration_secs,
        };

        info!(scan_id = %report.id, "{}", report.summary());

        Ok(report)
    }

    fn evaluate_batch(
        &self,
        batch: &[String],
        mut fetched: SeriesBatch,
        universe: &TickerUniverse,
        results: &mut ScanResults,
        stats: &mut ScanStats,
    ) {
        for symbol in batch {
            let series = match fetched.remove(symbol) {
                Some(raw) => PriceSeries::clean(symbol.as_str(), &raw),
                None => {
                    debug!(symbol = %symbol, "No series returned");
                    stats.record_skip(SkipReason::SymbolDataInvalid);
                    continue;
                }
            };

            let series = match series {
                Ok(series) => series,
                Err(e) => {
                    debug!(symbol = %symbol, reason = %e, "Unusable series");
                    stats.record_skip(SkipReason::SymbolDataInvalid);
                    continue;
                }
            };

            stats.symbols_evaluated += 1;
            match self.strategy.evaluate(&series) {
                Evaluation::Match(m) => {
                    debug!(symbol = %symbol, price = m.current_price, "Match");
                    stats.matched += 1;
                    results.push(ScanResult::new(
                        symbol.as_str(),
                        universe.display_name(symbol),
                        m.current_price,
                        m.detail,
                        series,
                        m.indicators,
                    ));
                }
                Evaluation::NoMatch(reason) => stats.record_skip(reason),
            }
        }
    }
}

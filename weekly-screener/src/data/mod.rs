//! Price history model and series repositories.
//!
//! Repositories hand back [`RawBar`]s whose prices may be missing; the
//! scanner turns them into a clean [`PriceSeries`] before any strategy
//! looks at them.
//!
//! # Data Sources
//! - **Yahoo chart API**: weekly OHLC per symbol, fetched concurrently
//!   within a batch behind a token-bucket rate limiter.

mod provider;
mod rate_limiter;
mod yahoo;

pub use provider::{ProviderError, SeriesBatch, SeriesRepository};
pub use rate_limiter::{shared_limiter, RateLimiter, SharedRateLimiter};
pub use yahoo::YahooChartRepository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request Parameters
// ============================================================================

/// Bar interval requested from a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// Weekly bars
    Weekly,
}

impl Timeframe {
    /// Interval parameter understood by the chart API.
    pub fn to_api_interval(&self) -> &'static str {
        match self {
            Self::Weekly => "1wk",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_api_interval())
    }
}

/// How much history to request, in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback {
    pub years: u32,
}

impl Lookback {
    pub const fn years(years: u32) -> Self {
        Self { years }
    }

    /// Range parameter understood by the chart API (e.g. "5y").
    pub fn to_api_range(&self) -> String {
        format!("{}y", self.years)
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self::years(5)
    }
}

// ============================================================================
// Bars
// ============================================================================

/// A bar as delivered by a repository; any price may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

impl RawBar {
    /// Convert into a [`PriceBar`] when every field is present and finite.
    pub fn complete(&self) -> Option<PriceBar> {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        Some(PriceBar {
            timestamp: self.timestamp,
            open: finite(self.open)?,
            high: finite(self.high)?,
            low: finite(self.low)?,
            close: finite(self.close)?,
        })
    }

    fn has_close(&self) -> bool {
        self.close.map_or(false, f64::is_finite)
    }
}

/// One weekly OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar open time
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

// ============================================================================
// Series
// ============================================================================

/// Why a repository payload could not become a usable series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSeries {
    #[error("no bars returned")]
    Empty,
    #[error("close column entirely missing")]
    NoCloses,
    #[error("no complete bars after cleaning")]
    EmptyAfterCleaning,
}

/// Chronologically ascending bars for one ticker, no duplicate timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, sorting by time and keeping the last bar for any
    /// repeated timestamp.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self {
            symbol: symbol.into(),
            bars: deduped,
        }
    }

    /// Clean a repository payload: drop every bar with a missing field.
    pub fn clean(symbol: impl Into<String>, raw: &[RawBar]) -> Result<Self, InvalidSeries> {
        if raw.is_empty() {
            return Err(InvalidSeries::Empty);
        }
        if !raw.iter().any(RawBar::has_close) {
            return Err(InvalidSeries::NoCloses);
        }

        let bars: Vec<PriceBar> = raw.iter().filter_map(RawBar::complete).collect();
        if bars.is_empty() {
            return Err(InvalidSeries::EmptyAfterCleaning);
        }

        Ok(Self::new(symbol, bars))
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Latest close price.
    pub fn current_close(&self) -> Option<f64> {
        self.last().map(|b| b.close)
    }

    /// The most recent `n` bars (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

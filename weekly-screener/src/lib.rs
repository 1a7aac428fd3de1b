//! Weekly Screener Library
//!
//! Screens a universe of equities for weekly chart patterns and renders
//! the matches as cards.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     weekly-screener                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Universe       │  │  Batch          │  │  Card           │     │
//! │  │  Sources+Cache  │─▶│  Scanner        │─▶│  Renderer       │     │
//! │  └─────────────────┘  └────────┬────────┘  └─────────────────┘     │
//! │                                │                                    │
//! │                    ┌───────────┴───────────┐                        │
//! │                    ▼                       ▼                        │
//! │          Series Repository         Strategies (SMA)                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Reversal
//! - **Long decline**: close at least 50% below the 5-year high
//! - **Bottom-out**: close at least 10% above the 1-year low
//! - **Turn**: SMA13 rising and price above it
//!
//! ## Trend follow
//! - **Perfect order**: close > SMA13 > SMA26 > SMA52
//! - **Long-term rise**: SMA52 above its value four weeks earlier

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod indicators;
pub mod screener;
pub mod strategy;
pub mod universe;

use std::sync::Arc;

use screener_common::config::Config;

use crate::data::{SeriesRepository, YahooChartRepository};
use crate::screener::{BatchScanner, ProgressSink, ScanConfig, ScanError, ScanReport};
use crate::universe::{Market, TickerUniverse, UniverseCache};

/// Screener service: configuration, repository, and cached universes.
pub struct ScreenerService {
    config: Config,
    repository: Arc<dyn SeriesRepository>,
    universes: UniverseCache,
}

impl ScreenerService {
    /// Create a service backed by the chart API named in the config.
    pub fn new(config: Config) -> Self {
        let repository = Arc::new(YahooChartRepository::from_config(&config.screener.data));
        Self::with_repository(config, repository)
    }

    /// Create a service with an explicit repository.
    pub fn with_repository(config: Config, repository: Arc<dyn SeriesRepository>) -> Self {
        Self {
            config,
            repository,
            universes: UniverseCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn universes(&self) -> &UniverseCache {
        &self.universes
    }

    /// Universe for `market`, loaded on first use.
    pub async fn universe(&self, market: Market) -> Arc<TickerUniverse> {
        let source = market.source(&self.config.screener.data);
        self.universes.get_or_load(source.as_ref()).await
    }

    /// Forget the cached universe so the next scan reloads it.
    pub async fn invalidate_universe(&self, market: Market) {
        self.universes.invalidate(market).await;
    }

    /// Run one scan over the configured market's universe.
    pub async fn scan(
        &self,
        scan: ScanConfig,
        progress: &mut dyn ProgressSink,
    ) -> Result<ScanReport, ScanError> {
        let universe = self.universe(scan.market).await;
        let scanner = BatchScanner::new(scan, Arc::clone(&self.repository))?;
        scanner.run(&universe, progress).await
    }
}

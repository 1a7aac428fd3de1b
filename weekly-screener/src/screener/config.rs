//! Scan configuration.
//!
//! [`ScanConfig`] is the resolved, validated form of the `screener`
//! section of the config file: market and strategy parsed, parameters
//! range-checked, batch size known to be non-zero.

use serde::Serialize;
use thiserror::Error;

use screener_common::config::Config;

use crate::data::{Lookback, Timeframe};
use crate::strategy::{ParamsError, StrategyKind, StrategyParams};
use crate::universe::Market;

/// Errors that stop a scan before or instead of producing a report.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The universe has no symbols to scan
    #[error("ticker universe is empty")]
    EmptyUniverse,

    /// Configuration rejected before scanning
    #[error("invalid scan configuration: {0}")]
    InvalidConfig(String),

    /// Strategy parameters out of range
    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Everything one scan needs besides the universe and the repository.
#[derive(Debug, Clone, Serialize)]
pub struct ScanConfig {
    pub market: Market,
    pub params: StrategyParams,
    /// Cap on symbols scanned, taken from the head of the universe
    pub max_tickers: usize,
    /// Symbols fetched and evaluated together
    pub batch_size: usize,
    pub lookback: Lookback,
    pub interval: Timeframe,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            market: Market::TsePrime,
            params: StrategyParams::Reversal(Default::default()),
            max_tickers: 1607,
            batch_size: 20,
            lookback: Lookback::default(),
            interval: Timeframe::Weekly,
        }
    }
}

impl ScanConfig {
    /// Resolve from the config file.
    pub fn from_config(config: &Config) -> Result<Self, ScanError> {
        let settings = &config.screener;

        let market = Market::parse(&settings.market)
            .ok_or_else(|| ScanError::InvalidConfig(format!("unknown market: {}", settings.market)))?;
        let params = StrategyParams::from_settings(settings)?;

        let scan = Self {
            market,
            params,
            max_tickers: settings.max_tickers,
            batch_size: settings.batch_size,
            lookback: Lookback::years(settings.lookback_years),
            interval: Timeframe::Weekly,
        };
        scan.validate()?;
        Ok(scan)
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.batch_size == 0 {
            return Err(ScanError::InvalidConfig("batch_size must be > 0".into()));
        }
        if self.max_tickers == 0 {
            return Err(ScanError::InvalidConfig("max_tickers must be > 0".into()));
        }
        if self.lookback.years == 0 {
            return Err(ScanError::InvalidConfig("lookback_years must be > 0".into()));
        }
        self.params.validate()?;
        Ok(())
    }

    pub fn strategy(&self) -> StrategyKind {
        self.params.kind()
    }

    /// Number of batches needed for `symbols` symbols.
    pub fn batch_count(&self, symbols: usize) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        symbols.div_ceil(self.batch_size)
    }

    /// One-line description for logs and report headers.
    pub fn summary(&self) -> String {
        let params = match &self.params {
            StrategyParams::Reversal(p) => format!(
                "drop>={:.0}%, recover>={:.0}%",
                p.drop_threshold * 100.0,
                p.recover_threshold * 100.0
            ),
            StrategyParams::Trend(p) if p.ma_margin > 0.0 => {
                format!("perfect order, <= {:.0}% above SMA52", p.ma_margin * 100.0)
            }
            StrategyParams::Trend(_) => "perfect order".to_string(),
        };
        format!(
            "{} on {} ({}), max {} tickers, batch {}",
            self.strategy(),
            self.market,
            params,
            self.max_tickers,
            self.batch_size
        )
    }
}

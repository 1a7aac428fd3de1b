//! Configuration management for the weekly screener.
//!
//! The screener reads a single JSON file at `~/.weekly-screener/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (SCREENER_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `SCREENER_LOG_LEVEL` → observability.log_level
//! - `SCREENER_LOG_FORMAT` → observability.log_format
//! - `SCREENER_MARKET` → screener.market
//! - `SCREENER_STRATEGY` → screener.strategy
//! - `SCREENER_MAX_TICKERS` → screener.max_tickers
//! - `SCREENER_BATCH_SIZE` → screener.batch_size

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".weekly-screener"),
        |dirs| dirs.home_dir().join(".weekly-screener"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Screening configuration
    #[serde(default)]
    pub screener: ScreenerSettings,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    ///
    /// `path` selects an explicit file; `None` uses the default location.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("SCREENER_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("SCREENER_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Ok(market) = std::env::var("SCREENER_MARKET") {
            self.screener.market = market;
        }
        if let Ok(strategy) = std::env::var("SCREENER_STRATEGY") {
            self.screener.strategy = strategy;
        }
        if let Ok(max) = std::env::var("SCREENER_MAX_TICKERS") {
            if let Ok(n) = max.parse() {
                self.screener.max_tickers = n;
            }
        }
        if let Ok(size) = std::env::var("SCREENER_BATCH_SIZE") {
            if let Ok(n) = size.parse() {
                self.screener.batch_size = n;
            }
        }
    }

    /// Save configuration to a path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets forced to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Screener Settings
// ============================================================================

/// Screening run settings.
///
/// Market and strategy are kept as strings here and parsed by the
/// screener crate, so this file stays readable by older builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerSettings {
    /// Market selector ("tse-prime", "sp500")
    #[serde(default = "default_market")]
    pub market: String,

    /// Strategy selector ("reversal", "trend")
    #[serde(default = "default_strategy")]
    pub strategy: String,

    #[serde(default)]
    pub reversal: ReversalSettings,

    #[serde(default)]
    pub trend: TrendSettings,

    /// Upper bound on tickers scanned, taken from the head of the universe
    #[serde(default = "default_max_tickers")]
    pub max_tickers: usize,

    /// Tickers fetched and evaluated together
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Weekly history fetched per ticker, in years
    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,

    #[serde(default)]
    pub data: DataSourceSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

impl Default for ScreenerSettings {
    fn default() -> Self {
        Self {
            market: default_market(),
            strategy: default_strategy(),
            reversal: ReversalSettings::default(),
            trend: TrendSettings::default(),
            max_tickers: default_max_tickers(),
            batch_size: default_batch_size(),
            lookback_years: default_lookback_years(),
            data: DataSourceSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

fn default_market() -> String {
    "tse-prime".into()
}

fn default_strategy() -> String {
    "reversal".into()
}

fn default_max_tickers() -> usize {
    1607
}

fn default_batch_size() -> usize {
    20
}

fn default_lookback_years() -> u32 {
    5
}

/// Thresholds for the reversal strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversalSettings {
    /// Minimum drop from the lookback high (fraction)
    #[serde(default = "default_drop_threshold")]
    pub drop_threshold: f64,

    /// Minimum rebound from the one-year low (fraction)
    #[serde(default = "default_recover_threshold")]
    pub recover_threshold: f64,
}

impl Default for ReversalSettings {
    fn default() -> Self {
        Self {
            drop_threshold: default_drop_threshold(),
            recover_threshold: default_recover_threshold(),
        }
    }
}

fn default_drop_threshold() -> f64 {
    0.50
}

fn default_recover_threshold() -> f64 {
    0.10
}

/// Settings for the trend-follow strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendSettings {
    /// Maximum extension of price above SMA52 (fraction); 0 disables the cap
    #[serde(default)]
    pub ma_margin: f64,
}

/// Remote data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceSettings {
    /// Base URL of the chart API
    #[serde(default = "default_chart_base_url")]
    pub chart_base_url: String,

    /// Exchange listing document for the TSE universe (workbook or CSV)
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// HTML page carrying the S&P 500 constituents table
    #[serde(default = "default_index_table_url")]
    pub index_table_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Outbound request budget per minute
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u32,
}

impl Default for DataSourceSettings {
    fn default() -> Self {
        Self {
            chart_base_url: default_chart_base_url(),
            listing_url: default_listing_url(),
            index_table_url: default_index_table_url(),
            request_timeout_secs: default_request_timeout_secs(),
            rate_limit_rpm: default_rate_limit_rpm(),
        }
    }
}

fn default_chart_base_url() -> String {
    "https://query1.finance.yahoo.com".into()
}

fn default_listing_url() -> String {
    "https://www.jpx.co.jp/markets/statistics-equities/misc/tvdivq0000001vg2-att/data_j.xls".into()
}

fn default_index_table_url() -> String {
    "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_rate_limit_rpm() -> u32 {
    600
}

/// Rendering settings for scan results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Report format ("markdown", "json")
    #[serde(default = "default_output_format")]
    pub format: String,

    /// Cards per row in the markdown grid (2 or 3)
    #[serde(default = "default_columns")]
    pub columns: usize,

    /// Directory where reports are saved (stdout only when unset)
    #[serde(default)]
    pub report_dir: Option<String>,

    /// Number of recent closes drawn in each card's sparkline
    #[serde(default = "default_sparkline_width")]
    pub sparkline_width: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            columns: default_columns(),
            report_dir: None,
            sparkline_width: default_sparkline_width(),
        }
    }
}

fn default_output_format() -> String {
    "markdown".into()
}

fn default_columns() -> usize {
    3
}

fn default_sparkline_width() -> usize {
    26
}

// ============================================================================
// Tests
// ============================================================================

//! Command-line interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use screener_common::config::Config;

/// Weekly chart screener for TSE Prime and S&P 500 stocks.
#[derive(Parser, Debug)]
#[command(name = "weekly-screener")]
#[command(version)]
#[command(about = "Screen weekly charts for reversal and trend setups.", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ~/.weekly-screener/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the market and print the matching cards
    Scan(ScanArgs),

    /// List the ticker universe for a market
    Universe {
        /// Market ("tse-prime" or "sp500")
        #[arg(long)]
        market: Option<String>,

        /// Only print the first N entries
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Strategy ("reversal" or "trend")
    #[arg(long, short)]
    pub strategy: Option<String>,

    /// Market ("tse-prime" or "sp500")
    #[arg(long, short)]
    pub market: Option<String>,

    /// Cap on tickers scanned
    #[arg(long)]
    pub max_tickers: Option<usize>,

    /// Tickers per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Reversal: minimum drop from the 5-year high (0.0-1.0)
    #[arg(long = "drop")]
    pub drop_threshold: Option<f64>,

    /// Reversal: minimum rebound from the 1-year low (0.0-1.0)
    #[arg(long = "recover")]
    pub recover_threshold: Option<f64>,

    /// Trend: maximum extension above SMA52 (0 disables)
    #[arg(long)]
    pub ma_margin: Option<f64>,

    /// Cards per row (2 or 3)
    #[arg(long)]
    pub columns: Option<usize>,

    /// Report format ("markdown" or "json")
    #[arg(long)]
    pub format: Option<String>,

    /// Save the report here instead of the configured report directory
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl ScanArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        let s = &mut config.screener;
        if let Some(ref strategy) = self.strategy {
            s.strategy = strategy.clone();
        }
        if let Some(ref market) = self.market {
            s.market = market.clone();
        }
        if let Some(n) = self.max_tickers {
            s.max_tickers = n;
        }
        if let Some(n) = self.batch_size {
            s.batch_size = n;
        }
        if let Some(v) = self.drop_threshold {
            s.reversal.drop_threshold = v;
        }
        if let Some(v) = self.recover_threshold {
            s.reversal.recover_threshold = v;
        }
        if let Some(v) = self.ma_margin {
            s.trend.ma_margin = v;
        }
        if let Some(n) = self.columns {
            s.output.columns = n;
        }
        if let Some(ref format) = self.format {
            s.output.format = format.clone();
        }
    }
}

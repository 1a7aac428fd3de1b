//! Yahoo Finance chart API repository.
//!
//! # Endpoint
//! `GET {base}/v8/finance/chart/{symbol}?range=5y&interval=1wk`
//!
//! The response carries parallel arrays: one `timestamp` column (unix
//! seconds) and `open`/`high`/`low`/`close` columns under
//! `indicators.quote[0]`, any entry of which may be `null`.
//!
//! # Batch Semantics
//! - Symbols in one batch are requested concurrently
//! - Unknown or delisted symbols (404, empty result) are omitted
//! - The batch fails only when every symbol failed at the transport level

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use screener_common::config::DataSourceSettings;

use super::provider::{ProviderError, SeriesBatch, SeriesRepository};
use super::rate_limiter::{shared_limiter, SharedRateLimiter};
use super::{Lookback, RawBar, Timeframe};

// ============================================================================
// Constants
// ============================================================================

/// Chart endpoint path prefix
const CHART_ENDPOINT: &str = "/v8/finance/chart";

/// Retry hint after a 429
const RATE_LIMIT_RETRY_SECS: u64 = 2;

/// The chart API rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (compatible; weekly-screener)";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Zip the column arrays into bars; short columns read as missing.
fn columns_to_bars(result: ChartResult) -> Vec<RawBar> {
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let timestamp = Utc.timestamp_opt(ts, 0).single()?;
            Some(RawBar {
                timestamp,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
            })
        })
        .collect()
}

// ============================================================================
// Yahoo Repository
// ============================================================================

/// Weekly OHLC history from the Yahoo chart API.
pub struct YahooChartRepository {
    base_url: String,
    client: reqwest::Client,
    rate_limiter: SharedRateLimiter,
}

impl YahooChartRepository {
    /// Create a repository against `base_url` with default limits.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_limits(base_url, Duration::from_secs(30), 600)
    }

    /// Create with an explicit timeout and request budget.
    pub fn with_limits(base_url: impl Into<String>, timeout: Duration, rate_limit_rpm: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            rate_limiter: shared_limiter("yahoo", rate_limit_rpm),
        }
    }

    /// Create from data source settings
    pub fn from_config(settings: &DataSourceSettings) -> Self {
        Self::with_limits(
            settings.chart_base_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
            settings.rate_limit_rpm,
        )
    }

    /// Fetch one symbol's bars.
    async fn fetch_symbol(
        &self,
        symbol: &str,
        lookback: Lookback,
        interval: Timeframe,
    ) -> Result<Vec<RawBar>, ProviderError> {
        let url = format!("{}{}/{}", self.base_url, CHART_ENDPOINT, symbol);

        self.rate_limiter.acquire().await;

        debug!(url = %url, symbol = symbol, "Fetching weekly chart");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("range", lookback.to_api_range()),
                ("interval", interval.to_api_interval().to_string()),
            ])
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::DataNotAvailable(symbol.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: Some(RATE_LIMIT_RETRY_SECS),
            });
        }

        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::InvalidRequest(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let parsed: ChartResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse chart: {}", e)))?;

        if let Some(err) = parsed.chart.error {
            return Err(ProviderError::DataNotAvailable(format!(
                "{}: {}",
                err.code.unwrap_or_default(),
                err.description.unwrap_or_default()
            )));
        }

        let result = parsed
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ProviderError::DataNotAvailable(symbol.to_string()))?;

        Ok(columns_to_bars(result))
    }
}

#[async_trait]
impl SeriesRepository for YahooChartRepository {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch(
        &self,
        symbols: &[String],
        lookback: Lookback,
        interval: Timeframe,
    ) -> Result<SeriesBatch, ProviderError> {
        if symbols.is_empty() {
            return Ok(SeriesBatch::new());
        }

        let outcomes = join_all(
            symbols
                .iter()
                .map(|symbol| self.fetch_symbol(symbol, lookback, interval)),
        )
        .await;

        let mut batch = SeriesBatch::with_capacity(symbols.len());
        let mut transport_failures = Vec::new();

        for (symbol, outcome) in symbols.iter().zip(outcomes) {
            match outcome {
                Ok(bars) => {
                    batch.insert(symbol.clone(), bars);
                }
                Err(e) if e.is_missing_symbol() => {
                    debug!(symbol = %symbol, "No chart data, omitting");
                }
                Err(e) if e.is_recoverable() => {
                    warn!(symbol = %symbol, error = %e, "Chart request failed");
                    transport_failures.push(e);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Unusable chart response, omitting");
                }
            }
        }

        if transport_failures.len() == symbols.len() {
            return Err(transport_failures.swap_remove(0));
        }

        Ok(batch)
    }
}

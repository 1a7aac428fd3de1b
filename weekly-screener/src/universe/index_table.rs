//! Index constituents table source (S&P 500).
//!
//! Reads the constituents table from an HTML page (the Wikipedia list
//! by default). The table is `#constituents` when present, otherwise the
//! first `wikitable` whose header has a symbol column.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

use screener_common::config::DataSourceSettings;

use super::{Market, TickerUniverse, UniverseSource};

const SYMBOL_HEADERS: &[&str] = &["symbol", "ticker"];
const NAME_HEADERS: &[&str] = &["security", "company", "name"];

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Invalid CSS selector {}: {:?}", css, e))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn header_position(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.to_lowercase();
        keywords.iter().any(|k| h.contains(k))
    })
}

/// Parse the constituents table out of an HTML document.
pub fn parse_constituents_table(html: &str) -> Result<TickerUniverse> {
    let document = Html::parse_document(html);
    let table_sel = selector("table#constituents, table.wikitable")?;
    let row_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let td_sel = selector("td")?;

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);
        let Some(header_row) = rows.next() else {
            continue;
        };
        let headers: Vec<String> = header_row.select(&th_sel).map(cell_text).collect();

        let Some(symbol_col) = header_position(&headers, SYMBOL_HEADERS) else {
            continue;
        };
        let name_col = header_position(&headers, NAME_HEADERS);

        let mut universe = TickerUniverse::new();
        for row in rows {
            let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
            let Some(symbol) = cells
                .get(symbol_col)
                .and_then(|raw| Market::Sp500.normalize_symbol(raw))
            else {
                continue;
            };
            let name = name_col
                .and_then(|i| cells.get(i))
                .cloned()
                .unwrap_or_default();
            universe.insert(symbol, name);
        }

        if !universe.is_empty() {
            return Ok(universe);
        }
    }

    bail!("No constituents table found")
}

/// Constituents table fetched over HTTP.
pub struct IndexTableSource {
    url: String,
    client: reqwest::Client,
}

impl IndexTableSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("weekly-screener")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            url: url.into(),
            client,
        }
    }

    /// Create from data source settings
    pub fn from_config(settings: &DataSourceSettings) -> Self {
        Self::new(
            settings.index_table_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }
}

#[async_trait]
impl UniverseSource for IndexTableSource {
    fn name(&self) -> &'static str {
        "index-table"
    }

    fn market(&self) -> Market {
        Market::Sp500
    }

    async fn load(&self) -> Result<TickerUniverse> {
        debug!(url = %self.url, "Fetching constituents page");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to fetch constituents page")?;

        if !response.status().is_success() {
            bail!("HTTP error: {}", response.status());
        }

        let html = response.text().await.context("Failed to read response body")?;
        parse_constituents_table(&html)
    }
}

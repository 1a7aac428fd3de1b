//! Exchange listing document source (TSE Prime).
//!
//! The exchange publishes its issue list as an Excel workbook
//! (`data_j.xls`); CSV exports of the same list are accepted too. Column
//! positions vary between exports, so the code, name, and market columns
//! are located by header keywords.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

use screener_common::config::DataSourceSettings;

use super::{Market, TickerUniverse, UniverseSource};

const CODE_KEYWORDS: &[&str] = &["コード", "code"];
const NAME_KEYWORDS: &[&str] = &["銘柄名", "name"];
const MARKET_KEYWORDS: &[&str] = &["市場", "区分", "market"];
const PRIME_MARKERS: &[&str] = &["プライム", "prime"];

// ============================================================================
// Parsing
// ============================================================================

/// First column whose header contains any keyword (case-insensitive).
fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.to_lowercase();
        keywords.iter().any(|k| h.contains(&k.to_lowercase()))
    })
}

/// Header row followed by data rows, from any tabular format.
fn parse_listing_rows<I>(mut rows: I) -> Result<TickerUniverse>
where
    I: Iterator<Item = Vec<String>>,
{
    let headers = rows.next().context("Listing has no header row")?;
    let (Some(code_col), Some(name_col), Some(market_col)) = (
        find_column(&headers, CODE_KEYWORDS),
        find_column(&headers, NAME_KEYWORDS),
        find_column(&headers, MARKET_KEYWORDS),
    ) else {
        bail!("Listing header lacks code/name/market columns: {:?}", headers);
    };

    let mut universe = TickerUniverse::new();
    for row in rows {
        let section = row
            .get(market_col)
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        if !PRIME_MARKERS.iter().any(|m| section.contains(m)) {
            continue;
        }

        let Some(symbol) = row
            .get(code_col)
            .and_then(|code| Market::TsePrime.normalize_symbol(code))
        else {
            continue;
        };
        let name = row.get(name_col).map(|s| s.trim()).unwrap_or_default();
        universe.insert(symbol, name);
    }

    Ok(universe)
}

/// Parse a listing CSV into the Prime-section universe.
pub fn parse_listing_csv(text: &str) -> Result<TickerUniverse> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let rows = reader
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Malformed listing row")?;

    parse_listing_rows(rows.into_iter())
}

fn workbook_cell(cell: &Data) -> String {
    match cell {
        // Codes are stored as numbers in the exchange workbook.
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Parse the first sheet of a listing workbook (xls, xlsx, ods) into the
/// Prime-section universe.
pub fn parse_listing_workbook(bytes: &[u8]) -> Result<TickerUniverse> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).context("Unreadable listing workbook")?;

    let range = workbook
        .worksheet_range_at(0)
        .context("Listing workbook has no sheets")?
        .context("Failed to read listing sheet")?;

    parse_listing_rows(
        range
            .rows()
            .map(|row| row.iter().map(workbook_cell).collect::<Vec<_>>()),
    )
}

// ============================================================================
// Source
// ============================================================================

/// Encoding of the listing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    Csv,
    Workbook,
}

impl ListingFormat {
    /// `.csv` URLs are read as CSV, everything else as a workbook.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(&['?', '#'][..]).next().unwrap_or_default();
        if path.to_lowercase().ends_with(".csv") {
            Self::Csv
        } else {
            Self::Workbook
        }
    }
}

/// Listing document fetched over HTTP.
pub struct ListingSource {
    url: String,
    format: ListingFormat,
    client: reqwest::Client,
}

impl ListingSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("weekly-screener")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            format: ListingFormat::from_url(&url),
            url,
            client,
        }
    }

    /// Create from data source settings
    pub fn from_config(settings: &DataSourceSettings) -> Self {
        Self::new(
            settings.listing_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn format(&self) -> ListingFormat {
        self.format
    }
}

#[async_trait]
impl UniverseSource for ListingSource {
    fn name(&self) -> &'static str {
        "listing"
    }

    fn market(&self) -> Market {
        Market::TsePrime
    }

    async fn load(&self) -> Result<TickerUniverse> {
        debug!(url = %self.url, format = ?self.format, "Fetching listing document");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to fetch listing")?;

        if !response.status().is_success() {
            bail!("HTTP error: {}", response.status());
        }

        match self.format {
            ListingFormat::Csv => {
                let text = response.text().await.context("Failed to read listing body")?;
                parse_listing_csv(&text)
            }
            ListingFormat::Workbook => {
                let bytes = response.bytes().await.context("Failed to read listing body")?;
                parse_listing_workbook(&bytes)
            }
        }
    }
}

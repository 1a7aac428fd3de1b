//! Ticker universes.
//!
//! A universe is the ordered set of symbols a scan walks through, each
//! with a display name. Universes come from an external source per
//! market and fall back to a short built-in list when that source is
//! unreachable or returns nothing.
//!
//! # Markets
//!
//! | Market | Source | Symbol form |
//! |--------|--------|-------------|
//! | `tse-prime` | Exchange listing workbook (`data_j.xls`) | `7203.T` |
//! | `sp500` | Index constituents table (HTML) | `BRK-B` |

mod cache;
mod fallback;
mod index_table;
mod listing;

pub use cache::UniverseCache;
pub use fallback::fallback_universe;
pub use index_table::{parse_constituents_table, IndexTableSource};
pub use listing::{parse_listing_csv, parse_listing_workbook, ListingFormat, ListingSource};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

use screener_common::config::DataSourceSettings;

// ============================================================================
// Market
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Market {
    /// Tokyo Stock Exchange, Prime section
    TsePrime,
    /// S&P 500 constituents
    Sp500,
}

impl Market {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tse-prime" | "tse_prime" | "tse" | "prime" | "jp" => Some(Self::TsePrime),
            "sp500" | "s&p500" | "s&p 500" | "spx" | "us" => Some(Self::Sp500),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TsePrime => "tse-prime",
            Self::Sp500 => "sp500",
        }
    }

    /// Currency symbol used on result cards.
    pub fn currency(&self) -> &'static str {
        match self {
            Self::TsePrime => "¥",
            Self::Sp500 => "$",
        }
    }

    /// Turn a source code into the symbol the chart API expects.
    ///
    /// TSE codes keep their leading four digits and gain `.T`. S&P symbols
    /// replace share-class dots with dashes (`BRK.B` becomes `BRK-B`).
    pub fn normalize_symbol(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        match self {
            Self::TsePrime => {
                let head: String = raw.chars().take(4).collect();
                if head.len() == 4 && head.chars().all(|c| c.is_ascii_digit()) {
                    Some(format!("{}.T", head))
                } else {
                    None
                }
            }
            Self::Sp500 => {
                if raw.is_empty() {
                    None
                } else {
                    Some(raw.to_uppercase().replace('.', "-"))
                }
            }
        }
    }

    /// Source configured for this market.
    pub fn source(&self, settings: &DataSourceSettings) -> Box<dyn UniverseSource> {
        match self {
            Self::TsePrime => Box::new(ListingSource::from_config(settings)),
            Self::Sp500 => Box::new(IndexTableSource::from_config(settings)),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Ticker Universe
// ============================================================================

/// Ordered symbol to display-name mapping without duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerUniverse {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl TickerUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol; a repeated symbol keeps its position and takes the new name.
    pub fn insert(&mut self, symbol: impl Into<String>, name: impl Into<String>) {
        let symbol = symbol.into();
        let name = name.into();
        match self.index.get(&symbol) {
            Some(&pos) => self.entries[pos].1 = name,
            None => {
                self.index.insert(symbol.clone(), self.entries.len());
                self.entries.push((symbol, name));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn name(&self, symbol: &str) -> Option<&str> {
        self.index.get(symbol).map(|&pos| self.entries[pos].1.as_str())
    }

    /// Name for display, falling back to the symbol itself.
    pub fn display_name<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.name(symbol).filter(|n| !n.is_empty()).unwrap_or(symbol)
    }

    /// Symbols in universe order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(s, _)| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, n)| (s.as_str(), n.as_str()))
    }

    /// First `n` symbols, in order.
    pub fn head(&self, n: usize) -> Vec<String> {
        self.entries.iter().take(n).map(|(s, _)| s.clone()).collect()
    }
}

impl<S: Into<String>, N: Into<String>> FromIterator<(S, N)> for TickerUniverse {
    fn from_iter<I: IntoIterator<Item = (S, N)>>(iter: I) -> Self {
        let mut universe = Self::new();
        for (symbol, name) in iter {
            universe.insert(symbol, name);
        }
        universe
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Where a market's universe comes from.
#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &'static str;

    fn market(&self) -> Market;

    async fn load(&self) -> anyhow::Result<TickerUniverse>;
}

/// Load from `source`, falling back to the built-in list on error or empty result.
pub async fn load_with_fallback(source: &dyn UniverseSource) -> TickerUniverse {
    let market = source.market();
    match source.load().await {
        Ok(universe) if !universe.is_empty() => {
            info!(
                market = %market,
                source = source.name(),
                symbols = universe.len(),
                "Ticker universe loaded"
            );
            universe
        }
        Ok(_) => {
            warn!(market = %market, source = source.name(), "Universe source returned no symbols, using fallback list");
            fallback_universe(market)
        }
        Err(e) => {
            warn!(market = %market, source = source.name(), error = %e, "Universe source failed, using fallback list");
            fallback_universe(market)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Built-in universes used when the live source is unavailable.

use super::{Market, TickerUniverse};

const TSE_PRIME: &[(&str, &str)] = &[
    ("2413.T", "エムスリー"),
    ("9984.T", "ソフトバンクG"),
    ("6758.T", "ソニーG"),
    ("6981.T", "村田製作所"),
    ("4385.T", "メルカリ"),
    ("7974.T", "任天堂"),
];

const SP500: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft"),
    ("AMZN", "Amazon"),
    ("NVDA", "Nvidia"),
    ("GOOGL", "Alphabet Inc. (Class A)"),
    ("META", "Meta Platforms"),
    ("BRK-B", "Berkshire Hathaway"),
    ("JPM", "JPMorgan Chase"),
    ("XOM", "ExxonMobil"),
    ("JNJ", "Johnson & Johnson"),
];

/// The built-in universe for `market`.
pub fn fallback_universe(market: Market) -> TickerUniverse {
    let entries = match market {
        Market::TsePrime => TSE_PRIME,
        Market::Sp500 => SP500,
    };
    entries.iter().copied().collect()
}

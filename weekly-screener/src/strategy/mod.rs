//! Chart-pattern strategies.
//!
//! Each strategy is a pure predicate over one cleaned weekly series. A
//! strategy never fails: data problems become a classified
//! [`SkipReason`] so the scanner can count them and move on.
//!
//! # Strategies
//!
//! | Kind | Pattern |
//! |------|---------|
//! | `reversal` | Deep drop from the 5-year high, rebound off the 1-year low, rising SMA13 |
//! | `trend` | Perfect order close > SMA13 > SMA26 > SMA52 with a rising SMA52 |

mod reversal;
mod trend;

pub use reversal::{ReversalRatios, ReversalSnapshot, ReversalStrategy};
pub use trend::{TrendSnapshot, TrendStrategy};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use screener_common::config::ScreenerSettings;

use crate::data::PriceSeries;
use crate::indicators::IndicatorSet;

/// Bars required before any strategy evaluates a series (one year).
pub const MIN_HISTORY_BARS: usize = 52;

// ============================================================================
// Strategy Kind
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Long decline followed by a bottom-out
    Reversal,
    /// Sustained uptrend in perfect order
    Trend,
}

impl StrategyKind {
    /// Parse from a config or CLI value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reversal" | "rebound" => Some(Self::Reversal),
            "trend" | "trend-follow" | "trend_follow" => Some(Self::Trend),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reversal => "reversal",
            Self::Trend => "trend",
        }
    }

    /// Human-readable title for reports.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Reversal => "Reversal (bottom-out)",
            Self::Trend => "Trend follow (perfect order)",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Invalid strategy parameter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamsError {
    #[error("{field} must be in {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

fn check_open_unit(field: &'static str, value: f64) -> Result<(), ParamsError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ParamsError::OutOfRange {
            field,
            range: "(0, 1)",
            value,
        })
    }
}

/// Thresholds for [`ReversalStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReversalParams {
    /// Minimum drop from the 5-year high, as a fraction
    pub drop_threshold: f64,
    /// Minimum rise from the 1-year low, as a fraction
    pub recover_threshold: f64,
}

impl Default for ReversalParams {
    fn default() -> Self {
        Self {
            drop_threshold: 0.50,
            recover_threshold: 0.10,
        }
    }
}

impl ReversalParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_open_unit("drop_threshold", self.drop_threshold)?;
        check_open_unit("recover_threshold", self.recover_threshold)
    }
}

/// Parameters for [`TrendStrategy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendParams {
    /// Maximum extension of close above SMA52; 0 disables the cap
    pub ma_margin: f64,
}

impl TrendParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if (0.0..1.0).contains(&self.ma_margin) {
            Ok(())
        } else {
            Err(ParamsError::OutOfRange {
                field: "ma_margin",
                range: "[0, 1)",
                value: self.ma_margin,
            })
        }
    }
}

/// Parameters of the selected strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum StrategyParams {
    Reversal(ReversalParams),
    Trend(TrendParams),
}

impl StrategyParams {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Reversal(_) => StrategyKind::Reversal,
            Self::Trend(_) => StrategyKind::Trend,
        }
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        match self {
            Self::Reversal(p) => p.validate(),
            Self::Trend(p) => p.validate(),
        }
    }

    /// Build validated parameters for the strategy named in the settings.
    pub fn from_settings(settings: &ScreenerSettings) -> Result<Self, ParamsError> {
        let kind = StrategyKind::parse(&settings.strategy)
            .ok_or_else(|| ParamsError::UnknownStrategy(settings.strategy.clone()))?;
        let params = Self::for_kind(kind, settings);
        params.validate()?;
        Ok(params)
    }

    /// Parameters for `kind`, read from the matching settings section.
    pub fn for_kind(kind: StrategyKind, settings: &ScreenerSettings) -> Self {
        match kind {
            StrategyKind::Reversal => Self::Reversal(ReversalParams {
                drop_threshold: settings.reversal.drop_threshold,
                recover_threshold: settings.reversal.recover_threshold,
            }),
            StrategyKind::Trend => Self::Trend(TrendParams {
                ma_margin: settings.trend.ma_margin,
            }),
        }
    }
}

// ============================================================================
// Evaluation Outcome
// ============================================================================

/// Why a symbol produced no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer bars than the strategy needs
    InsufficientHistory,
    /// A reference price is zero, negative or not finite
    DegenerateMetric,
    /// Series missing or empty after cleaning
    SymbolDataInvalid,
    /// Data was fine, the pattern is not there
    ConditionsNotMet,
}

impl SkipReason {
    /// True when the skip reflects a data problem rather than a verdict.
    pub fn is_data_problem(&self) -> bool {
        !matches!(self, Self::ConditionsNotMet)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InsufficientHistory => "insufficient history",
            Self::DegenerateMetric => "degenerate metric",
            Self::SymbolDataInvalid => "symbol data invalid",
            Self::ConditionsNotMet => "conditions not met",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Fraction shown as a percentage
    Percent,
    /// Price level
    Price,
}

/// One labelled number shown on a result card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: &'static str,
    pub value: f64,
    pub kind: MetricKind,
}

impl Metric {
    pub fn percent(label: &'static str, value: f64) -> Self {
        Self {
            label,
            value,
            kind: MetricKind::Percent,
        }
    }

    pub fn price(label: &'static str, value: f64) -> Self {
        Self {
            label,
            value,
            kind: MetricKind::Price,
        }
    }

    /// Value formatted for display ("55%", "1,234.50").
    pub fn formatted(&self) -> String {
        match self.kind {
            MetricKind::Percent => format!("{:.0}%", self.value * 100.0),
            MetricKind::Price => format_price(self.value),
        }
    }
}

/// Format a price with thousands separators and two decimals.
pub fn format_price(value: f64) -> String {
    let raw = format!("{:.2}", value.abs());
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Strategy-specific payload of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum MatchDetail {
    Reversal {
        drop_ratio: f64,
        recover_ratio: f64,
        five_year_high: f64,
        five_year_high_at: DateTime<Utc>,
        one_year_low: f64,
        one_year_low_at: DateTime<Utc>,
    },
    Trend {
        sma13: f64,
        sma26: f64,
        sma52: f64,
        /// SMA52 four bars before the last
        sma52_prior: f64,
        /// close / SMA52 - 1
        extension: f64,
    },
}

impl MatchDetail {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Reversal { .. } => StrategyKind::Reversal,
            Self::Trend { .. } => StrategyKind::Trend,
        }
    }

    /// Ordered display metrics.
    pub fn metrics(&self) -> Vec<Metric> {
        match self {
            Self::Reversal {
                drop_ratio,
                recover_ratio,
                five_year_high,
                one_year_low,
                ..
            } => vec![
                Metric::percent("Drop from 5y high", *drop_ratio),
                Metric::percent("Rebound from 1y low", *recover_ratio),
                Metric::price("5y high", *five_year_high),
                Metric::price("1y low", *one_year_low),
            ],
            Self::Trend {
                sma13,
                sma26,
                sma52,
                extension,
                ..
            } => vec![
                Metric::percent("Above SMA52", *extension),
                Metric::price("SMA13", *sma13),
                Metric::price("SMA26", *sma26),
                Metric::price("SMA52", *sma52),
            ],
        }
    }
}

/// A successful evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyMatch {
    /// Close of the last bar
    pub current_price: f64,
    pub detail: MatchDetail,
    /// Lines drawn with the series on the result card
    pub indicators: IndicatorSet,
}

/// Outcome of evaluating one series.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Match(StrategyMatch),
    NoMatch(SkipReason),
}

impl Evaluation {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match(_))
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Match(_) => None,
            Self::NoMatch(reason) => Some(*reason),
        }
    }
}

impl From<SkipReason> for Evaluation {
    fn from(reason: SkipReason) -> Self {
        Self::NoMatch(reason)
    }
}

// ============================================================================
// Strategy Trait
// ============================================================================

/// A chart-pattern predicate over one weekly series.
pub trait ScreeningStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Evaluate the series. Never panics on bad data.
    fn evaluate(&self, series: &PriceSeries) -> Evaluation;
}

/// Instantiate the strategy for `params`.
pub fn build_strategy(params: &StrategyParams) -> Box<dyn ScreeningStrategy> {
    match params {
        StrategyParams::Reversal(p) => Box::new(ReversalStrategy::new(*p)),
        StrategyParams::Trend(p) => Box::new(TrendStrategy::new(*p)),
    }
}

/// Shared history guard.
pub(crate) fn require_history(series: &PriceSeries) -> Result<(), SkipReason> {
    if series.len() < MIN_HISTORY_BARS {
        Err(SkipReason::InsufficientHistory)
    } else {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_parse() {
        assert_eq!(StrategyKind::parse("Reversal"), Some(StrategyKind::Reversal));
        assert_eq!(StrategyKind::parse("trend-follow"), Some(StrategyKind::Trend));
        assert_eq!(StrategyKind::parse("momentum"), None);
    }

    #[test]
    fn test_params_validation() {
        assert!(ReversalParams::default().validate().is_ok());
        assert!(ReversalParams {
            drop_threshold: 1.0,
            recover_threshold: 0.1
        }
        .validate()
        .is_err());
        assert!(ReversalParams {
            drop_threshold: 0.5,
            recover_threshold: 0.0
        }
        .validate()
        .is_err());

        assert!(TrendParams { ma_margin: 0.0 }.validate().is_ok());
        assert!(TrendParams { ma_margin: 1.0 }.validate().is_err());
        assert!(TrendParams { ma_margin: -0.1 }.validate().is_err());
    }

    #[test]
    fn test_params_from_settings() {
        let mut settings = ScreenerSettings::default();
        let params = StrategyParams::from_settings(&settings).unwrap();
        assert_eq!(params, StrategyParams::Reversal(ReversalParams::default()));

        settings.strategy = "trend".into();
        settings.trend.ma_margin = 0.3;
        let params = StrategyParams::from_settings(&settings).unwrap();
        assert_eq!(params, StrategyParams::Trend(TrendParams { ma_margin: 0.3 }));

        settings.strategy = "breakout".into();
        assert_eq!(
            StrategyParams::from_settings(&settings),
            Err(ParamsError::UnknownStrategy("breakout".into()))
        );
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.5), "0.50");
        assert_eq!(format_price(450.0), "450.00");
        assert_eq!(format_price(1234.5), "1,234.50");
        assert_eq!(format_price(1234567.891), "1,234,567.89");
        assert_eq!(format_price(-1000.0), "-1,000.00");
    }

    #[test]
    fn test_metric_formatting() {
        assert_eq!(Metric::percent("drop", 0.55).formatted(), "55%");
        assert_eq!(Metric::price("high", 1000.0).formatted(), "1,000.00");
    }

    #[test]
    fn test_short_series_never_matches() {
        let series = test_support::flat_bars(&vec![100.0; MIN_HISTORY_BARS - 1]);
        for params in [
            StrategyParams::Reversal(ReversalParams::default()),
            StrategyParams::Trend(TrendParams::default()),
        ] {
            let strategy = build_strategy(&params);
            assert_eq!(
                strategy.evaluate(&series),
                Evaluation::NoMatch(SkipReason::InsufficientHistory)
            );
        }
    }

    #[test]
    fn test_skip_reason_classification() {
        assert!(SkipReason::DegenerateMetric.is_data_problem());
        assert!(!SkipReason::ConditionsNotMet.is_data_problem());
    }
}

//! Reversal (bottom-out) strategy.
//!
//! Matches a stock that fell hard from its 5-year high, has since
//! bounced off its 1-year low, and whose 13-week average has turned up
//! with price above it.

use chrono::{DateTime, Utc};

use super::{
    require_history, Evaluation, MatchDetail, ReversalParams, ScreeningStrategy, SkipReason,
    StrategyKind, StrategyMatch, MIN_HISTORY_BARS,
};
use crate::data::{PriceBar, PriceSeries};
use crate::indicators::{sma_name, IndicatorSet};

/// Window of the short moving average.
const SMA_WINDOW: usize = 13;

/// The figures the reversal conditions are checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReversalSnapshot {
    pub close: f64,
    /// Highest high over the full series
    pub five_year_high: f64,
    /// Lowest low over the last 52 bars
    pub one_year_low: f64,
    pub sma13_last: f64,
    pub sma13_prev: f64,
}

/// Ratios of a snapshot that passed every condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReversalRatios {
    pub drop_ratio: f64,
    pub recover_ratio: f64,
}

fn usable_reference(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

impl ReversalSnapshot {
    /// Apply the reversal conditions.
    pub fn check(&self, params: &ReversalParams) -> Result<ReversalRatios, SkipReason> {
        if !usable_reference(self.five_year_high) || !usable_reference(self.one_year_low) {
            return Err(SkipReason::DegenerateMetric);
        }

        let drop_ratio = (self.five_year_high - self.close) / self.five_year_high;
        let recover_ratio = self.close / self.one_year_low - 1.0;

        let big_drop = drop_ratio >= params.drop_threshold;
        let bottomed_out = recover_ratio >= params.recover_threshold;
        let recovering = self.sma13_last > self.sma13_prev && self.close > self.sma13_last;

        if big_drop && bottomed_out && recovering {
            Ok(ReversalRatios {
                drop_ratio,
                recover_ratio,
            })
        } else {
            Err(SkipReason::ConditionsNotMet)
        }
    }
}

/// Extreme bar by `key`, first occurrence wins.
fn extreme_by<F>(bars: &[PriceBar], key: F, want_max: bool) -> Option<(f64, DateTime<Utc>)>
where
    F: Fn(&PriceBar) -> f64,
{
    bars.iter().fold(None, |best, bar| {
        let value = key(bar);
        match best {
            Some((b, _)) if (want_max && value <= b) || (!want_max && value >= b) => best,
            _ => Some((value, bar.timestamp)),
        }
    })
}

/// Deep-drop-then-rebound predicate.
#[derive(Debug, Clone)]
pub struct ReversalStrategy {
    params: ReversalParams,
}

impl ReversalStrategy {
    pub fn new(params: ReversalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ReversalParams {
        &self.params
    }

    fn try_evaluate(&self, series: &PriceSeries) -> Result<StrategyMatch, SkipReason> {
        require_history(series)?;

        let (five_year_high, five_year_high_at) =
            extreme_by(series.bars(), |b| b.high, true).ok_or(SkipReason::InsufficientHistory)?;
        let (one_year_low, one_year_low_at) =
            extreme_by(series.tail(MIN_HISTORY_BARS), |b| b.low, false)
                .ok_or(SkipReason::InsufficientHistory)?;

        let indicators = IndicatorSet::with_smas(series, &[SMA_WINDOW]);
        let sma13 = indicators
            .get(&sma_name(SMA_WINDOW))
            .ok_or(SkipReason::InsufficientHistory)?;
        let (sma13_last, sma13_prev) = match (sma13.latest(), sma13.back(1)) {
            (Some(last), Some(prev)) => (last, prev),
            _ => return Err(SkipReason::InsufficientHistory),
        };

        let close = series
            .current_close()
            .ok_or(SkipReason::SymbolDataInvalid)?;

        let snapshot = ReversalSnapshot {
            close,
            five_year_high,
            one_year_low,
            sma13_last,
            sma13_prev,
        };
        let ratios = snapshot.check(&self.params)?;

        Ok(StrategyMatch {
            current_price: close,
            detail: MatchDetail::Reversal {
                drop_ratio: ratios.drop_ratio,
                recover_ratio: ratios.recover_ratio,
                five_year_high,
                five_year_high_at,
                one_year_low,
                one_year_low_at,
            },
            indicators,
        })
    }
}

impl ScreeningStrategy for ReversalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Reversal
    }

    fn evaluate(&self, series: &PriceSeries) -> Evaluation {
        match self.try_evaluate(series) {
            Ok(m) => Evaluation::Match(m),
            Err(reason) => Evaluation::NoMatch(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{flat_bars, ramp};

    fn params(drop: f64, recover: f64) -> ReversalParams {
        ReversalParams {
            drop_threshold: drop,
            recover_threshold: recover,
        }
    }

    /// 100 bars at 1000, slide to 400 by bar 230, climb to `last` at bar 259.
    fn bottom_out_closes(last: f64) -> Vec<f64> {
        let mut closes = vec![1000.0; 100];
        closes.extend(ramp(1000.0, 400.0, 131));
        closes.extend(ramp(400.0, last, 29));
        closes
    }

    fn snapshot(close: f64) -> ReversalSnapshot {
        ReversalSnapshot {
            close,
            five_year_high: 1000.0,
            one_year_low: 400.0,
            sma13_last: 430.0,
            sma13_prev: 425.0,
        }
    }

    #[test]
    fn test_snapshot_match() {
        let ratios = snapshot(450.0).check(&ReversalParams::default()).unwrap();
        assert!((ratios.drop_ratio - 0.55).abs() < 1e-9);
        assert!((ratios.recover_ratio - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_shallow_drop() {
        // drop 0.45 < 0.5
        let mut snap = snapshot(550.0);
        snap.sma13_last = 530.0;
        snap.sma13_prev = 520.0;
        assert_eq!(
            snap.check(&ReversalParams::default()),
            Err(SkipReason::ConditionsNotMet)
        );
    }

    #[test]
    fn test_snapshot_falling_sma() {
        let mut snap = snapshot(450.0);
        snap.sma13_prev = 435.0;
        assert_eq!(
            snap.check(&ReversalParams::default()),
            Err(SkipReason::ConditionsNotMet)
        );
    }

    #[test]
    fn test_snapshot_degenerate_references() {
        let mut snap = snapshot(450.0);
        snap.five_year_high = 0.0;
        assert_eq!(snap.check(&ReversalParams::default()), Err(SkipReason::DegenerateMetric));

        let mut snap = snapshot(450.0);
        snap.one_year_low = 0.0;
        assert_eq!(snap.check(&ReversalParams::default()), Err(SkipReason::DegenerateMetric));

        let mut snap = snapshot(450.0);
        snap.one_year_low = f64::NAN;
        assert_eq!(snap.check(&ReversalParams::default()), Err(SkipReason::DegenerateMetric));
    }

    #[test]
    fn test_series_match() {
        let closes = bottom_out_closes(450.0);
        assert_eq!(closes.len(), 260);
        let series = flat_bars(&closes);

        let strategy = ReversalStrategy::new(ReversalParams::default());
        let Evaluation::Match(m) = strategy.evaluate(&series) else {
            panic!("expected a match");
        };

        assert!((m.current_price - 450.0).abs() < 1e-9);
        match m.detail {
            MatchDetail::Reversal {
                drop_ratio,
                recover_ratio,
                five_year_high,
                five_year_high_at,
                one_year_low,
                one_year_low_at,
            } => {
                assert!((drop_ratio - 0.55).abs() < 1e-9);
                assert!((recover_ratio - 0.125).abs() < 1e-9);
                assert_eq!(five_year_high, 1000.0);
                assert_eq!(five_year_high_at, series.bars()[0].timestamp);
                assert!((one_year_low - 400.0).abs() < 1e-9);
                assert_eq!(one_year_low_at, series.bars()[230].timestamp);
            }
            other => panic!("unexpected detail {:?}", other),
        }
        assert!(m.indicators.get("SMA13").is_some());
    }

    #[test]
    fn test_series_shallow_drop_no_match() {
        let series = flat_bars(&bottom_out_closes(550.0));
        let strategy = ReversalStrategy::new(ReversalParams::default());
        assert_eq!(
            strategy.evaluate(&series),
            Evaluation::NoMatch(SkipReason::ConditionsNotMet)
        );
    }

    #[test]
    fn test_series_zero_high_is_degenerate() {
        let series = flat_bars(&vec![0.0; 60]);
        let strategy = ReversalStrategy::new(ReversalParams::default());
        assert_eq!(
            strategy.evaluate(&series),
            Evaluation::NoMatch(SkipReason::DegenerateMetric)
        );
    }

    #[test]
    fn test_match_is_monotonic_in_thresholds() {
        let series = flat_bars(&bottom_out_closes(450.0));
        let grid = [0.05, 0.10, 0.20, 0.30, 0.40, 0.50, 0.55, 0.60, 0.70];

        for &drop in &grid {
            for &recover in &grid {
                let matched = ReversalStrategy::new(params(drop, recover))
                    .evaluate(&series)
                    .is_match();
                if !matched {
                    continue;
                }
                for &lower_drop in grid.iter().filter(|&&d| d <= drop) {
                    for &lower_recover in grid.iter().filter(|&&r| r <= recover) {
                        assert!(
                            ReversalStrategy::new(params(lower_drop, lower_recover))
                                .evaluate(&series)
                                .is_match(),
                            "({}, {}) matched but ({}, {}) did not",
                            drop,
                            recover,
                            lower_drop,
                            lower_recover
                        );
                    }
                }
            }
        }

        assert!(ReversalStrategy::new(params(0.5, 0.1)).evaluate(&series).is_match());
        assert!(!ReversalStrategy::new(params(0.6, 0.1)).evaluate(&series).is_match());
        assert!(!ReversalStrategy::new(params(0.5, 0.2)).evaluate(&series).is_match());
    }
}

//! Trend-follow (perfect order) strategy.

use super::{
    require_history, Evaluation, MatchDetail, ScreeningStrategy, SkipReason, StrategyKind,
    StrategyMatch, TrendParams,
};
use crate::data::PriceSeries;
use crate::indicators::{sma_name, IndicatorSet, DEFAULT_SMA_WINDOWS};

/// Bars between the current SMA52 and the one it must exceed.
const SLOPE_LOOKBACK: usize = 4;

/// The figures the trend conditions are checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSnapshot {
    pub close: f64,
    pub sma13: f64,
    pub sma26: f64,
    pub sma52: f64,
    /// SMA52 four bars before the last
    pub sma52_prior: f64,
}

impl TrendSnapshot {
    /// Apply the trend conditions; returns the extension above SMA52.
    pub fn check(&self, params: &TrendParams) -> Result<f64, SkipReason> {
        if !(self.sma52.is_finite() && self.sma52 > 0.0) {
            return Err(SkipReason::DegenerateMetric);
        }

        let perfect_order =
            self.close > self.sma13 && self.sma13 > self.sma26 && self.sma26 > self.sma52;
        let long_term_rising = self.sma52 > self.sma52_prior;
        let above_support = self.close > self.sma52;

        let extension = self.close / self.sma52 - 1.0;
        let within_margin = params.ma_margin <= 0.0 || extension <= params.ma_margin;

        if perfect_order && long_term_rising && above_support && within_margin {
            Ok(extension)
        } else {
            Err(SkipReason::ConditionsNotMet)
        }
    }
}

/// Close > SMA13 > SMA26 > SMA52 with a rising SMA52.
#[derive(Debug, Clone)]
pub struct TrendStrategy {
    params: TrendParams,
}

impl TrendStrategy {
    pub fn new(params: TrendParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrendParams {
        &self.params
    }

    fn try_evaluate(&self, series: &PriceSeries) -> Result<StrategyMatch, SkipReason> {
        require_history(series)?;

        let indicators = IndicatorSet::with_smas(series, &DEFAULT_SMA_WINDOWS);
        let latest = |window: usize| {
            indicators
                .latest(&sma_name(window))
                .ok_or(SkipReason::InsufficientHistory)
        };
        let [w13, w26, w52] = DEFAULT_SMA_WINDOWS;

        // 52..=55 bars leave SMA52 undefined four bars back.
        let sma52_prior = indicators
            .get(&sma_name(w52))
            .and_then(|line| line.back(SLOPE_LOOKBACK))
            .ok_or(SkipReason::InsufficientHistory)?;

        let snapshot = TrendSnapshot {
            close: series
                .current_close()
                .ok_or(SkipReason::SymbolDataInvalid)?,
            sma13: latest(w13)?,
            sma26: latest(w26)?,
            sma52: latest(w52)?,
            sma52_prior,
        };
        let extension = snapshot.check(&self.params)?;

        Ok(StrategyMatch {
            current_price: snapshot.close,
            detail: MatchDetail::Trend {
                sma13: snapshot.sma13,
                sma26: snapshot.sma26,
                sma52: snapshot.sma52,
                sma52_prior,
                extension,
            },
            indicators,
        })
    }
}

impl ScreeningStrategy for TrendStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Trend
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
    use crate::strategy::test_support::flat_bars;

    fn snapshot() -> TrendSnapshot {
        TrendSnapshot {
            close: 110.0,
            sma13: 105.0,
            sma26: 100.0,
            sma52: 95.0,
            sma52_prior: 93.0,
        }
    }

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn test_snapshot_perfect_order_matches() {
        let extension = snapshot().check(&TrendParams::default()).unwrap();
        assert!((extension - (110.0 / 95.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_single_inversion_fails() {
        let inversions = [
            TrendSnapshot { close: 104.0, ..snapshot() },
            TrendSnapshot { sma13: 99.0, ..snapshot() },
            TrendSnapshot { sma26: 94.0, ..snapshot() },
            TrendSnapshot { sma13: 100.0, ..snapshot() },
        ];
        for snap in inversions {
            assert_eq!(
                snap.check(&TrendParams::default()),
                Err(SkipReason::ConditionsNotMet),
                "{:?}",
                snap
            );
        }
    }

    #[test]
    fn test_snapshot_flat_sma52_fails() {
        let snap = TrendSnapshot {
            sma52_prior: 95.0,
            ..snapshot()
        };
        assert_eq!(
            snap.check(&TrendParams::default()),
            Err(SkipReason::ConditionsNotMet)
        );
    }

    #[test]
    fn test_ma_margin_caps_extension() {
        // extension is about 15.8%
        assert!(snapshot().check(&TrendParams { ma_margin: 0.20 }).is_ok());
        assert_eq!(
            snapshot().check(&TrendParams { ma_margin: 0.10 }),
            Err(SkipReason::ConditionsNotMet)
        );
    }

    #[test]
    fn test_series_uptrend_matches() {
        let series = flat_bars(&rising(120));
        let strategy = TrendStrategy::new(TrendParams::default());
        let Evaluation::Match(m) = strategy.evaluate(&series) else {
            panic!("expected a match");
        };

        assert_eq!(m.current_price, 219.0);
        let names: Vec<&str> = m.indicators.lines().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["SMA13", "SMA26", "SMA52"]);
        match m.detail {
            MatchDetail::Trend { sma13, sma52, sma52_prior, .. } => {
                assert_eq!(sma13, 213.0);
                assert_eq!(sma52, 193.5);
                assert_eq!(sma52_prior, 189.5);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_series_pullback_below_sma13_fails() {
        let mut closes = rising(120);
        closes.push(200.0);
        let series = flat_bars(&closes);
        let strategy = TrendStrategy::new(TrendParams::default());
        assert_eq!(
            strategy.evaluate(&series),
            Evaluation::NoMatch(SkipReason::ConditionsNotMet)
        );
    }

    #[test]
    fn test_series_without_sma52_slope_is_insufficient() {
        for len in 52..=55 {
            let series = flat_bars(&rising(len));
            let strategy = TrendStrategy::new(TrendParams::default());
            assert_eq!(
                strategy.evaluate(&series),
                Evaluation::NoMatch(SkipReason::InsufficientHistory),
                "len {}",
                len
            );
        }

        let series = flat_bars(&rising(56));
        assert!(TrendStrategy::new(TrendParams::default()).evaluate(&series).is_match());
    }
}

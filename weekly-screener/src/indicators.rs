//! Moving-average indicators over weekly closes.
//!
//! Every line is aligned index-for-index with the series it was computed
//! from. Positions before the window fills hold `None`.

use serde::{Deserialize, Serialize};

use crate::data::PriceSeries;

/// Windows drawn on every card (13, 26, 52 weeks).
pub const DEFAULT_SMA_WINDOWS: [usize; 3] = [13, 26, 52];

/// Simple moving average of `closes` over `window` bars.
///
/// Position `i` holds the mean of `closes[i + 1 - window..=i]` once
/// `i >= window - 1`. A window of zero, or one longer than the input,
/// yields all `None`.
pub fn simple_moving_average(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut values = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return values;
    }

    for i in (window - 1)..closes.len() {
        let sum: f64 = closes[i + 1 - window..=i].iter().sum();
        values[i] = Some(sum / window as f64);
    }

    values
}

/// Display name of an SMA line (e.g. "SMA13").
pub fn sma_name(window: usize) -> String {
    format!("SMA{}", window)
}

/// One named indicator line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorLine {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl IndicatorLine {
    /// Value at the last bar.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// Value `back` bars before the last one.
    pub fn back(&self, back: usize) -> Option<f64> {
        let idx = self.values.len().checked_sub(back + 1)?;
        self.at(idx)
    }

    pub fn at(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied().flatten()
    }
}

/// Named indicator lines in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    lines: Vec<IndicatorLine>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute one SMA line per window over the series closes.
    pub fn with_smas(series: &PriceSeries, windows: &[usize]) -> Self {
        let closes = series.closes();
        let mut set = Self::new();
        for &window in windows {
            set.insert(sma_name(window), simple_moving_average(&closes, window));
        }
        set
    }

    /// Insert a line, replacing any existing line with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) {
        let name = name.into();
        match self.lines.iter_mut().find(|l| l.name == name) {
            Some(line) => line.values = values,
            None => self.lines.push(IndicatorLine { name, values }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorLine> {
        self.lines.iter().find(|l| l.name == name)
    }

    /// Latest value of the named line.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(IndicatorLine::latest)
    }

    pub fn at(&self, name: &str, idx: usize) -> Option<f64> {
        self.get(name).and_then(|l| l.at(idx))
    }

    pub fn lines(&self) -> &[IndicatorLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

//! Mean-reversion (oversold) and overbought detection on Bollinger Bands.
//!
//! Oversold: close ≤ lower band and RSI ≤ 30; entry at the close, target
//! the middle band. Overbought mirrors it: close ≥ upper band and RSI ≥ 70.

use crate::domain::bar::Bar;
use crate::domain::indicator::bollinger::{self, Bands, bollinger_bands};
use crate::domain::indicator::{DEFAULT_RSI_PERIOD, rsi};

/// Bars looked ahead when checking whether price returned to the mean.
pub const REVERSION_HORIZON: usize = 20;
/// Bars required before `reversal_probability` trusts the history.
pub const MIN_PROBABILITY_HISTORY: usize = 100;
/// Fewest comparable instances for a historical estimate.
pub const MIN_COMPARABLE_INSTANCES: usize = 5;
pub const DEFAULT_REVERSAL_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanReversionParams {
    pub window: usize,
    pub k: f64,
    pub rsi_period: usize,
    pub oversold_rsi: f64,
    pub overbought_rsi: f64,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        MeanReversionParams {
            window: bollinger::DEFAULT_WINDOW,
            k: bollinger::DEFAULT_K,
            rsi_period: DEFAULT_RSI_PERIOD,
            oversold_rsi: 30.0,
            overbought_rsi: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opportunity {
    pub entry: f64,
    pub target: f64,
}

impl Opportunity {
    /// Expected move to target, in percent of entry.
    pub fn profit_potential_pct(&self) -> f64 {
        if self.entry == 0.0 {
            return 0.0;
        }
        (self.target - self.entry) / self.entry * 100.0
    }
}

fn latest_bands(series: &[Bar], params: &MeanReversionParams) -> Option<(f64, Bands)> {
    if params.window == 0 || series.len() < params.window {
        return None;
    }
    let close = series.last()?.close;
    let bands = bollinger_bands(series, params.window, params.k)
        .last()
        .copied()
        .flatten()?;
    Some((close, bands))
}

pub fn detect_mean_reversion(series: &[Bar], params: &MeanReversionParams) -> Option<Opportunity> {
    let (close, bands) = latest_bands(series, params)?;
    if close <= bands.lower && rsi(series, params.rsi_period) <= params.oversold_rsi {
        return Some(Opportunity {
            entry: close,
            target: bands.middle,
        });
    }
    None
}

pub fn detect_overbought(series: &[Bar], params: &MeanReversionParams) -> Option<Opportunity> {
    let (close, bands) = latest_bands(series, params)?;
    if close >= bands.upper && rsi(series, params.rsi_period) >= params.overbought_rsi {
        return Some(Opportunity {
            entry: close,
            target: bands.middle,
        });
    }
    None
}

/// Whether price closed at or above the middle band within the next
/// `REVERSION_HORIZON` bars after `index`. `None` when no bar follows.
pub(crate) fn reverted_to_mean(series: &[Bar], bands: &[Option<Bands>], index: usize) -> Option<bool> {
    let horizon = REVERSION_HORIZON.min(series.len().saturating_sub(index + 1));
    if horizon == 0 {
        return None;
    }
    let reverted = (index + 1..=index + horizon).any(|j| {
        bands[j].is_some_and(|b| series[j].close >= b.middle)
    });
    Some(reverted)
}

/// Per-bar z-scores of close against the bands.
pub(crate) fn z_scores(series: &[Bar], bands: &[Option<Bands>]) -> Vec<Option<f64>> {
    series
        .iter()
        .zip(bands)
        .map(|(bar, b)| b.and_then(|b| b.z_score(bar.close)))
        .collect()
}

/// Historical probability that price returns to the mean from a z-score
/// like the current one (within ±10%). Falls back to 0.5 with fewer than
/// 100 bars or fewer than 5 comparable instances.
pub fn reversal_probability(series: &[Bar], params: &MeanReversionParams) -> f64 {
    if series.len() < MIN_PROBABILITY_HISTORY {
        return DEFAULT_REVERSAL_PROBABILITY;
    }
    let bands = bollinger_bands(series, params.window, params.k);
    let z = z_scores(series, &bands);
    let Some(latest) = z.last().copied().flatten() else {
        return DEFAULT_REVERSAL_PROBABILITY;
    };

    let (lo, hi) = {
        let a = latest * 1.1;
        let b = latest * 0.9;
        (a.min(b), a.max(b))
    };
    let similar: Vec<usize> = z
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|v| *v >= lo && *v <= hi).map(|_| i))
        .collect();

    if similar.len() < MIN_COMPARABLE_INSTANCES {
        return DEFAULT_REVERSAL_PROBABILITY;
    }

    let successes = similar[..similar.len() - 1]
        .iter()
        .filter(|&&i| reverted_to_mean(series, &bands, i) == Some(true))
        .count();

    successes as f64 / similar.len() as f64
}

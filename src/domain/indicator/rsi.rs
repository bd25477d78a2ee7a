//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 (or degenerate when avg_gain is also 0).
//!
//! Warmup: n + 1 bars are needed for the first value.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorError, NEUTRAL_RSI, finite, require_bars};
use tracing::debug;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return None;
        }
        return Some(100.0);
    }
    Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
}

/// Per-bar RSI. Entries are `None` during warmup and for flat stretches
/// where neither gains nor losses occurred.
pub fn rsi_series(series: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut values = vec![None; series.len()];
    if period == 0 || series.len() < period + 1 {
        return values;
    }

    let changes: Vec<f64> = series.windows(2).map(|w| w[1].close - w[0].close).collect();
    let gain = |c: f64| if c > 0.0 { c } else { 0.0 };
    let loss = |c: f64| if c < 0.0 { -c } else { 0.0 };

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;
    values[period] = rsi_from_averages(avg_gain, avg_loss);

    for (i, &change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
        values[i + 1] = rsi_from_averages(avg_gain, avg_loss);
    }

    values
}

pub fn try_rsi(series: &[Bar], period: usize) -> Result<f64, IndicatorError> {
    require_bars(series.len(), period, period + 1)?;
    let value = rsi_series(series, period)
        .last()
        .copied()
        .flatten()
        .ok_or_else(|| IndicatorError::degenerate("no price movement in window"))?;
    finite(value, "rsi")
}

/// RSI at the last bar, or the neutral 50 when it cannot be computed.
pub fn rsi(series: &[Bar], period: usize) -> f64 {
    try_rsi(series, period).unwrap_or_else(|e| {
        debug!("rsi({period}) falling back to neutral: {e}");
        NEUTRAL_RSI
    })
}

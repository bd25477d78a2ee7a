//! Volatility: sample standard deviation of close-to-close percent change
//! over the trailing n changes, expressed in percent. Needs n + 1 bars.

use crate::domain::bar::Bar;
use crate::domain::indicator::stddev::sample_stddev;
use crate::domain::indicator::{DEFAULT_VOLATILITY_PCT, IndicatorError, finite, require_bars};
use tracing::debug;

pub fn try_volatility(series: &[Bar], period: usize) -> Result<f64, IndicatorError> {
    require_bars(series.len(), period, period + 1)?;
    let window = &series[series.len() - period - 1..];
    let mut returns = Vec::with_capacity(period);
    for w in window.windows(2) {
        if w[0].close == 0.0 {
            return Err(IndicatorError::degenerate("zero close in window"));
        }
        returns.push((w[1].close - w[0].close) / w[0].close);
    }
    let std = sample_stddev(&returns)
        .ok_or_else(|| IndicatorError::degenerate("need at least two returns"))?;
    finite(std * 100.0, "volatility")
}

pub fn volatility(series: &[Bar], period: usize) -> f64 {
    try_volatility(series, period).unwrap_or_else(|e| {
        debug!("volatility({period}) falling back to default: {e}");
        DEFAULT_VOLATILITY_PCT
    })
}

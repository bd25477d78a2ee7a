//! ATR (Average True Range).
//!
//! ATR(n) = mean of the last n true ranges, where each true range uses the
//! previous bar's close. Needs n + 1 bars. The fallback is the mean
//! high-low range of the trailing n bars.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorError, finite, require_bars};
use crate::domain::indicator::stddev::mean;
use tracing::debug;

pub fn try_atr(series: &[Bar], period: usize) -> Result<f64, IndicatorError> {
    require_bars(series.len(), period, period + 1)?;
    let window = &series[series.len() - period - 1..];
    let ranges: Vec<f64> = window
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();
    let value = mean(&ranges).ok_or_else(|| IndicatorError::degenerate("empty window"))?;
    finite(value, "atr")
}

pub fn atr(series: &[Bar], period: usize) -> f64 {
    try_atr(series, period).unwrap_or_else(|e| {
        debug!("atr({period}) falling back to high-low range: {e}");
        let start = series.len().saturating_sub(period);
        let ranges: Vec<f64> = series[start..].iter().map(Bar::range).collect();
        mean(&ranges).unwrap_or(0.0)
    })
}

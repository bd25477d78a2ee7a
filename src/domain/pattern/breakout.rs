//! Breakout / breakdown detection.
//!
//! A breakout needs the current bar's high and close above the highest high
//! of the previous `period` bars (the current bar excluded) together with a
//! volume surge: current volume > `volume_surge_multiple` × average volume.
//! A breakdown mirrors it on the lows.

use crate::domain::bar::Bar;
use crate::domain::indicator::average_volume;

/// Extra bars required beyond `period` before a detector will fire.
pub const LOOKAHEAD_BUFFER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutParams {
    pub period: usize,
    pub volume_surge_multiple: f64,
}

impl Default for BreakoutParams {
    fn default() -> Self {
        BreakoutParams {
            period: 20,
            volume_surge_multiple: 2.0,
        }
    }
}

impl BreakoutParams {
    pub fn min_bars(&self) -> usize {
        self.period + LOOKAHEAD_BUFFER
    }
}

fn prior_window(series: &[Bar], period: usize) -> Option<&[Bar]> {
    if period == 0 || series.len() < period + 1 {
        return None;
    }
    let end = series.len() - 1;
    Some(&series[end - period..end])
}

/// Highest high of the `period` bars before the last bar.
pub fn prior_high(series: &[Bar], period: usize) -> Option<f64> {
    prior_window(series, period)?
        .iter()
        .map(|b| b.high)
        .reduce(f64::max)
}

/// Lowest low of the `period` bars before the last bar.
pub fn prior_low(series: &[Bar], period: usize) -> Option<f64> {
    prior_window(series, period)?
        .iter()
        .map(|b| b.low)
        .reduce(f64::min)
}

fn volume_surge(series: &[Bar], params: &BreakoutParams) -> bool {
    let Some(current) = series.last() else {
        return false;
    };
    current.volume > average_volume(series, params.period) * params.volume_surge_multiple
}

pub fn detect_breakout(series: &[Bar], params: &BreakoutParams) -> bool {
    if params.period == 0 || series.len() < params.min_bars() {
        return false;
    }
    let (Some(level), Some(current)) = (prior_high(series, params.period), series.last()) else {
        return false;
    };
    current.high > level && current.close > level && volume_surge(series, params)
}

pub fn detect_breakdown(series: &[Bar], params: &BreakoutParams) -> bool {
    if params.period == 0 || series.len() < params.min_bars() {
        return false;
    }
    let (Some(level), Some(current)) = (prior_low(series, params.period), series.last()) else {
        return false;
    };
    current.low < level && current.close < level && volume_surge(series, params)
}

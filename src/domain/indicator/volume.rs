//! Simple moving average of volume.

use crate::domain::bar::Bar;
use crate::domain::indicator::stddev::mean;
use crate::domain::indicator::{IndicatorError, finite, require_bars};
use tracing::debug;

pub fn try_average_volume(series: &[Bar], period: usize) -> Result<f64, IndicatorError> {
    require_bars(series.len(), period, period)?;
    let volumes: Vec<f64> = series[series.len() - period..]
        .iter()
        .map(|b| b.volume)
        .collect();
    let value = mean(&volumes).ok_or_else(|| IndicatorError::degenerate("empty window"))?;
    finite(value, "average volume")
}

/// Average volume of the trailing `period` bars, or of the whole series
/// when the window cannot be filled.
pub fn average_volume(series: &[Bar], period: usize) -> f64 {
    try_average_volume(series, period).unwrap_or_else(|e| {
        debug!("average_volume({period}) falling back to series mean: {e}");
        let volumes: Vec<f64> = series.iter().map(|b| b.volume).collect();
        mean(&volumes).unwrap_or(0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::bar;
    use approx::assert_relative_eq;

    fn bars_with_volumes(volumes: &[f64]) -> Vec<Bar> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| bar(i, 10.0, 10.0, 10.0, 10.0, v))
            .collect()
    }

    #[test]
    fn trailing_window_only() {
        let bars = bars_with_volumes(&[1000.0, 10.0, 20.0, 30.0]);
        assert_relative_eq!(average_volume(&bars, 3), 20.0);
    }

    #[test]
    fn short_series_uses_whole_series_mean() {
        let bars = bars_with_volumes(&[10.0, 30.0]);
        assert!(try_average_volume(&bars, 20).is_err());
        assert_relative_eq!(average_volume(&bars, 20), 20.0);
    }

    #[test]
    fn empty_series_is_zero() {
        assert_eq!(average_volume(&[], 20), 0.0);
    }
}

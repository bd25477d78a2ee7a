//! Bollinger Bands.
//!
//! - Middle: simple moving average of close over n bars
//! - Upper: middle + k × stddev
//! - Lower: middle - k × stddev
//!
//! StdDev is the sample standard deviation (divides by n - 1).
//! Default parameters: window=20, k=2.0. Warmup: first (n-1) bars are None.

use crate::domain::bar::Bar;
use crate::domain::indicator::stddev::{mean, sample_stddev};

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_K: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub std: f64,
}

impl Bands {
    /// Percent deviation of `price` from the middle band.
    pub fn pct_deviation(&self, price: f64) -> Option<f64> {
        if self.middle == 0.0 {
            return None;
        }
        Some((price - self.middle) / self.middle * 100.0)
    }

    /// Deviation from the middle band in standard deviations.
    pub fn z_score(&self, price: f64) -> Option<f64> {
        if self.std == 0.0 {
            return None;
        }
        Some((price - self.middle) / self.std)
    }
}

pub fn bollinger_bands(series: &[Bar], window: usize, k: f64) -> Vec<Option<Bands>> {
    let mut values = Vec::with_capacity(series.len());
    if window < 2 {
        values.resize(series.len(), None);
        return values;
    }

    for i in 0..series.len() {
        if i + 1 < window {
            values.push(None);
            continue;
        }
        let closes: Vec<f64> = series[i + 1 - window..=i].iter().map(|b| b.close).collect();
        let bands = match (mean(&closes), sample_stddev(&closes)) {
            (Some(middle), Some(std)) => Some(Bands {
                upper: middle + k * std,
                middle,
                lower: middle - k * std,
                std,
            }),
            _ => None,
        };
        values.push(bands);
    }

    values
}

//! Series builders shared by unit tests.

use crate::domain::bar::Bar;
use chrono::{Duration, NaiveDate, NaiveDateTime};

pub fn timestamp(index: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
        + Duration::minutes(5 * index as i64)
}

pub fn bar(index: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: timestamp(index),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Flat candles (open = high = low = close) with constant volume.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(i, c, c, c, c, 1000.0))
        .collect()
}

/// Two overlaid sine waves (periods 13 and ~17 bars) around 100, closes
/// rounded to cents. Not periodic, so z-scores never repeat exactly.
pub fn two_wave(len: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..len)
        .map(|i| {
            let t = i as f64;
            let raw = 100.0
                + 5.0 * (2.0 * std::f64::consts::PI * t / 13.0).sin()
                + 2.0 * (t * 0.37).sin();
            (raw * 100.0).round() / 100.0
        })
        .collect();
    bars_from_closes(&closes)
}

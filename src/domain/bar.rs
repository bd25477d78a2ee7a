//! Price/volume bar representation.
//!
//! A series is a plain `&[Bar]` in ascending timestamp order at a fixed
//! interval. Consumers never reorder or mutate it.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_doji(&self) -> bool {
        self.close == self.open
    }

    /// Share of the candle range above the body. Zero for a flat candle.
    pub fn upper_wick_ratio(&self) -> f64 {
        let range = self.range();
        if range == 0.0 {
            return 0.0;
        }
        (self.high - self.open.max(self.close)) / range
    }
}

/// Bar interval requested from the data feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    FiveMinute,
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::FiveMinute => "5min",
            Interval::Daily => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "5min" | "5m" => Ok(Interval::FiveMinute),
            "1d" | "daily" | "day" => Ok(Interval::Daily),
            other => Err(format!("unknown interval '{other}'")),
        }
    }
}

/// Closing prices of a series, oldest first.
pub fn closes(series: &[Bar]) -> Vec<f64> {
    series.iter().map(|b| b.close).collect()
}

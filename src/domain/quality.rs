//! Multi-factor quality scoring of detected patterns.
//!
//! Each factor contributes a fixed number of points; the total is capped
//! at 100. A factor that cannot be evaluated (missing bands, zero average
//! volume, non-finite input) is skipped on its own and the remaining
//! factors still count.

use crate::domain::bar::Bar;
use crate::domain::indicator::bollinger::bollinger_bands;
use crate::domain::indicator::{DEFAULT_VOLUME_PERIOD, average_volume, rsi, try_average_volume};
use crate::domain::pattern::breakout::{BreakoutParams, prior_high};
use crate::domain::pattern::mean_reversion::{
    MIN_COMPARABLE_INSTANCES, MeanReversionParams, reverted_to_mean, z_scores,
};
use tracing::debug;

pub const MAX_SCORE: f64 = 100.0;

/// Points awarded per factor, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreCard {
    pub factors: Vec<(&'static str, f64)>,
}

impl ScoreCard {
    fn record(&mut self, name: &'static str, points: Option<f64>) {
        match points {
            Some(p) => self.factors.push((name, p)),
            None => debug!("quality factor '{name}' skipped"),
        }
    }

    pub fn points(&self, name: &str) -> Option<f64> {
        self.factors
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| *p)
    }

    pub fn total(&self) -> f64 {
        clamp_score(self.factors.iter().map(|(_, p)| p).sum())
    }
}

pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, MAX_SCORE)
}

fn volume_ratio(series: &[Bar], avg: f64) -> Option<f64> {
    let current = series.last()?.volume;
    if avg <= 0.0 || !avg.is_finite() {
        return None;
    }
    Some(current / avg)
}

// ── Breakout ─────────────────────────────────────────────────────────

fn rsi_momentum_points(rsi: f64) -> Option<f64> {
    if !rsi.is_finite() {
        return None;
    }
    let points = if (60.0..=80.0).contains(&rsi) {
        25.0
    } else if rsi > 80.0 {
        10.0
    } else if rsi >= 50.0 {
        15.0
    } else {
        0.0
    };
    Some(points)
}

fn breakout_volume_points(ratio: f64) -> f64 {
    if ratio >= 3.0 {
        25.0
    } else if ratio >= 2.0 {
        20.0
    } else if ratio >= 1.5 {
        15.0
    } else if ratio >= 1.0 {
        10.0
    } else {
        0.0
    }
}

fn candle_points(bar: &Bar) -> f64 {
    if bar.is_bullish() && bar.upper_wick_ratio() < 0.2 {
        25.0
    } else if bar.is_bullish() {
        15.0
    } else if bar.is_doji() {
        5.0
    } else {
        0.0
    }
}

fn volatility_points(volatility: f64) -> Option<f64> {
    if !volatility.is_finite() {
        return None;
    }
    let points = if (0.5..=2.0).contains(&volatility) {
        15.0
    } else if volatility > 2.0 && volatility <= 4.0 {
        10.0
    } else if volatility > 4.0 {
        5.0
    } else {
        0.0
    };
    Some(points)
}

/// Bars before the current one whose high came within ±2% of the level.
pub fn prior_tests(series: &[Bar], level: f64) -> usize {
    let Some((_, history)) = series.split_last() else {
        return 0;
    };
    history
        .iter()
        .filter(|b| b.high > level * 0.98 && b.high < level * 1.02)
        .count()
}

fn prior_test_points(series: &[Bar], period: usize) -> Option<f64> {
    let level = prior_high(series, period)?;
    let tests = prior_tests(series, level);
    let points = if tests >= 3 {
        10.0
    } else if tests >= 1 {
        5.0
    } else {
        0.0
    };
    Some(points)
}

pub fn breakout_scorecard(
    series: &[Bar],
    rsi: f64,
    volatility: f64,
    params: &BreakoutParams,
) -> ScoreCard {
    let mut card = ScoreCard::default();
    card.record("rsi_momentum", rsi_momentum_points(rsi));

    let avg = average_volume(series, DEFAULT_VOLUME_PERIOD);
    card.record(
        "volume",
        volume_ratio(series, avg).map(breakout_volume_points),
    );
    card.record("candle", series.last().map(candle_points));
    card.record("volatility", volatility_points(volatility));
    card.record("prior_tests", prior_test_points(series, params.period));
    card
}

/// Breakout quality in [0, 100].
pub fn breakout_quality(series: &[Bar], rsi: f64, volatility: f64, params: &BreakoutParams) -> f64 {
    breakout_scorecard(series, rsi, volatility, params).total()
}

// ── Mean reversion ───────────────────────────────────────────────────

fn deviation_points(pct_deviation: f64) -> f64 {
    if pct_deviation <= -5.0 {
        30.0
    } else if pct_deviation <= -4.0 {
        25.0
    } else if pct_deviation <= -3.0 {
        20.0
    } else if pct_deviation <= -2.0 {
        15.0
    } else if pct_deviation <= -1.0 {
        10.0
    } else {
        0.0
    }
}

fn oversold_rsi_points(rsi: f64) -> Option<f64> {
    if !rsi.is_finite() {
        return None;
    }
    let points = if rsi <= 20.0 {
        25.0
    } else if rsi <= 25.0 {
        20.0
    } else if rsi <= 30.0 {
        15.0
    } else if rsi <= 35.0 {
        10.0
    } else if rsi <= 40.0 {
        5.0
    } else {
        0.0
    };
    Some(points)
}

fn reversion_volume_points(ratio: f64) -> f64 {
    if ratio >= 2.0 {
        15.0
    } else if ratio >= 1.5 {
        10.0
    } else if ratio >= 1.0 {
        5.0
    } else {
        0.0
    }
}

fn success_rate_points(rate: f64) -> f64 {
    if rate >= 0.8 {
        15.0
    } else if rate >= 0.6 {
        10.0
    } else if rate >= 0.4 {
        5.0
    } else {
        0.0
    }
}

/// Fraction of bars at least as stretched as the current one (z-score ≤
/// current) that closed back at the middle band within the horizon.
/// `None` with fewer than five such bars.
///
/// Quadratic in the series length; callers pass bounded lookbacks.
pub fn historical_success_rate(series: &[Bar], params: &MeanReversionParams) -> Option<f64> {
    let bands = bollinger_bands(series, params.window, params.k);
    let z = z_scores(series, &bands);
    let current = z.last().copied().flatten()?;

    let instances: Vec<usize> = z
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|v| *v <= current).map(|_| i))
        .collect();
    if instances.len() < MIN_COMPARABLE_INSTANCES {
        return None;
    }

    let successes = instances
        .iter()
        .filter(|&&i| reverted_to_mean(series, &bands, i) == Some(true))
        .count();
    Some(successes as f64 / instances.len() as f64)
}

pub fn mean_reversion_scorecard(series: &[Bar], params: &MeanReversionParams) -> ScoreCard {
    let mut card = ScoreCard::default();
    if params.window == 0 || series.len() < params.window {
        return card;
    }

    let bands = bollinger_bands(series, params.window, params.k);
    let n = series.len();
    let latest = bands[n - 1];
    let close = series[n - 1].close;

    card.record(
        "deviation",
        latest
            .and_then(|b| b.pct_deviation(close))
            .map(deviation_points),
    );
    card.record("rsi", oversold_rsi_points(rsi(series, params.rsi_period)));

    let bounce = if n >= 3 {
        match (bands[n - 3], bands[n - 2]) {
            (Some(b2), Some(b1)) => {
                let (prev2, prev1) = (&series[n - 3], &series[n - 2]);
                if prev2.close <= b2.lower && prev1.close > prev2.close && close > prev1.close {
                    Some(15.0)
                } else if prev1.close <= b1.lower && close > prev1.close {
                    Some(10.0)
                } else {
                    Some(0.0)
                }
            }
            _ => None,
        }
    } else {
        None
    };
    card.record("bounce", bounce);

    let ratio = match try_average_volume(series, params.window) {
        Ok(avg) => volume_ratio(series, avg).unwrap_or(1.0),
        Err(_) => 1.0,
    };
    card.record("volume", Some(reversion_volume_points(ratio)));

    card.record(
        "success_rate",
        Some(historical_success_rate(series, params).map_or(0.0, success_rate_points)),
    );
    card
}

/// Mean-reversion quality in [0, 100]; 0 when the window is not filled.
pub fn mean_reversion_quality(series: &[Bar], params: &MeanReversionParams) -> f64 {
    mean_reversion_scorecard(series, params).total()
}

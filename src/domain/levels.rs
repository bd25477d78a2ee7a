//! Support/resistance level detection.
//!
//! Candidates are local extremes over a `2 * window + 1` bar neighbourhood.
//! Candidate prices are clustered greedily: sorted ascending, a price joins
//! the current group when it is within `threshold` (relative) of the group's
//! last member. Each group is reported as its mean.

use crate::domain::bar::Bar;
use std::fmt;

pub const DEFAULT_LEVEL_WINDOW: usize = 20;
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.01;
pub const DEFAULT_PROXIMITY_THRESHOLD: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelParams {
    pub window: usize,
    pub cluster_threshold: f64,
    pub proximity_threshold: f64,
}

impl Default for LevelParams {
    fn default() -> Self {
        LevelParams {
            window: DEFAULT_LEVEL_WINDOW,
            cluster_threshold: DEFAULT_CLUSTER_THRESHOLD,
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelKind {
    Support,
    Resistance,
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelKind::Support => write!(f, "support"),
            LevelKind::Resistance => write!(f, "resistance"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub price: f64,
    pub kind: LevelKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupportResistance {
    pub support: Vec<Level>,
    pub resistance: Vec<Level>,
}

/// |a - reference| / reference; `None` when the reference is zero.
fn relative_distance(a: f64, reference: f64) -> Option<f64> {
    if reference == 0.0 {
        return None;
    }
    Some((a - reference).abs() / reference.abs())
}

pub fn find_support_resistance(
    series: &[Bar],
    window: usize,
    cluster_threshold: f64,
) -> SupportResistance {
    if window == 0 || series.len() < window * 2 {
        return SupportResistance::default();
    }

    let mut lows = Vec::new();
    let mut highs = Vec::new();

    for i in window..series.len() - window {
        let before = &series[i - window..i];
        let after = &series[i + 1..=i + window];
        let bar = &series[i];

        if before.iter().chain(after).all(|b| bar.low <= b.low) {
            lows.push(bar.low);
        }
        if before.iter().chain(after).all(|b| bar.high >= b.high) {
            highs.push(bar.high);
        }
    }

    let to_levels = |prices: Vec<f64>, kind| {
        prices
            .into_iter()
            .map(|price| Level { price, kind })
            .collect()
    };

    SupportResistance {
        support: to_levels(group_similar_levels(&lows, cluster_threshold), LevelKind::Support),
        resistance: to_levels(
            group_similar_levels(&highs, cluster_threshold),
            LevelKind::Resistance,
        ),
    }
}

pub fn group_similar_levels(levels: &[f64], threshold: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = levels.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Vec::new();
    }
    sorted.sort_by(f64::total_cmp);

    let mut grouped = Vec::new();
    let mut group = vec![sorted[0]];

    for &level in &sorted[1..] {
        let last = group[group.len() - 1];
        let joins = match relative_distance(level, last) {
            Some(d) => d <= threshold,
            None => level == last,
        };
        if joins {
            group.push(level);
        } else {
            grouped.push(group.iter().sum::<f64>() / group.len() as f64);
            group = vec![level];
        }
    }
    grouped.push(group.iter().sum::<f64>() / group.len() as f64);

    grouped
}

pub fn is_near_level(price: f64, levels: &[Level], threshold: f64) -> bool {
    levels
        .iter()
        .any(|l| relative_distance(price, l.price).is_some_and(|d| d <= threshold))
}

/// Reward-to-risk ratio of a trade plan; zero when there is no risk.
pub fn risk_to_reward(entry: f64, stop_loss: f64, target: f64) -> f64 {
    let risk = (entry - stop_loss).abs();
    if risk == 0.0 {
        return 0.0;
    }
    (target - entry).abs() / risk
}

//! Candidate scanner.
//!
//! Evaluates every symbol of a universe independently and admits it when
//! price sits within a proximity window of the reference level. A failure
//! on one symbol is recorded and skipped; it never aborts the scan.

use std::fmt;

use crate::domain::bar::{Bar, Interval};
use crate::domain::error::SigtraderError;
use crate::domain::indicator::bollinger::bollinger_bands;
use crate::domain::indicator::{DEFAULT_RSI_PERIOD, DEFAULT_VOLATILITY_PERIOD, rsi, volatility};
use crate::domain::levels::{LevelParams, find_support_resistance, is_near_level};
use crate::domain::pattern::{
    BreakoutParams, MeanReversionParams, detect_breakout, detect_mean_reversion,
};
use crate::domain::quality::{breakout_quality, mean_reversion_quality};
use crate::ports::data_port::DataPort;
use tracing::{debug, info, warn};

/// 78 five-minute bars per session, five sessions.
pub const DEFAULT_BREAKOUT_LOOKBACK_BARS: usize = 5 * 78;
pub const DEFAULT_MIN_SCAN_BARS: usize = 30;
pub const DEFAULT_CANDIDATE_PROXIMITY: f64 = 0.02;
pub const DEFAULT_SERIES_LIMIT: usize = 100;
pub const DEFAULT_DAILY_SERIES_LIMIT: usize = 50;
/// Bars beyond the band window a mean-reversion scan requires.
pub const MEAN_REVERSION_EXTRA_BARS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Breakout,
    MeanReversion,
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateKind::Breakout => write!(f, "breakout"),
            CandidateKind::MeanReversion => write!(f, "mean_reversion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub symbol: String,
    pub kind: CandidateKind,
    pub current_price: f64,
    /// Period high for breakouts, lower band for mean reversion.
    pub reference_level: f64,
    pub distance_pct: f64,
    pub rsi: f64,
    pub volatility: f64,
    pub detected: bool,
    pub quality_score: f64,
    /// Middle band, mean-reversion candidates only.
    pub target: Option<f64>,
    /// Price is near a clustered support/resistance level.
    pub near_level: bool,
}

impl Candidate {
    pub fn profit_potential_pct(&self) -> Option<f64> {
        let target = self.target?;
        if self.current_price == 0.0 {
            return None;
        }
        Some((target - self.current_price) / self.current_price * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    pub breakout: BreakoutParams,
    pub mean_reversion: MeanReversionParams,
    pub levels: LevelParams,
    pub min_scan_bars: usize,
    pub candidate_proximity: f64,
    pub breakout_lookback_bars: usize,
    pub series_limit: usize,
    pub daily_series_limit: usize,
}

impl Default for ScanParams {
    fn default() -> Self {
        ScanParams {
            breakout: BreakoutParams::default(),
            mean_reversion: MeanReversionParams::default(),
            levels: LevelParams::default(),
            min_scan_bars: DEFAULT_MIN_SCAN_BARS,
            candidate_proximity: DEFAULT_CANDIDATE_PROXIMITY,
            breakout_lookback_bars: DEFAULT_BREAKOUT_LOOKBACK_BARS,
            series_limit: DEFAULT_SERIES_LIMIT,
            daily_series_limit: DEFAULT_DAILY_SERIES_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    NoData,
    NoPrice,
    InsufficientBars { bars: usize, minimum: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed(reason) => write!(f, "fetch failed: {reason}"),
            SkipReason::NoData => write!(f, "no data"),
            SkipReason::NoPrice => write!(f, "no live price"),
            SkipReason::InsufficientBars { bars, minimum } => {
                write!(f, "only {bars} bars, minimum {minimum} required")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Sorted by `quality_score`, highest first.
    pub candidates: Vec<Candidate>,
    pub skipped: Vec<SkippedSymbol>,
}

impl From<SigtraderError> for SkipReason {
    fn from(err: SigtraderError) -> Self {
        match err {
            SigtraderError::NoData { .. } => SkipReason::NoData,
            SigtraderError::InsufficientData { bars, minimum, .. } => {
                SkipReason::InsufficientBars { bars, minimum }
            }
            other => SkipReason::FetchFailed(other.to_string()),
        }
    }
}

fn require_bars(symbol: &str, series: &[Bar], minimum: usize) -> Result<(), SigtraderError> {
    if series.is_empty() {
        return Err(SigtraderError::NoData {
            symbol: symbol.to_string(),
        });
    }
    if series.len() < minimum {
        return Err(SigtraderError::InsufficientData {
            symbol: symbol.to_string(),
            bars: series.len(),
            minimum,
        });
    }
    Ok(())
}

fn near_any_level(series: &[Bar], price: f64, params: &LevelParams) -> bool {
    let levels = find_support_resistance(series, params.window, params.cluster_threshold);
    is_near_level(price, &levels.support, params.proximity_threshold)
        || is_near_level(price, &levels.resistance, params.proximity_threshold)
}

/// Breakout candidate check on a 5-minute series: price at most
/// `candidate_proximity` below the lookback high.
pub fn evaluate_breakout(
    symbol: &str,
    series: &[Bar],
    params: &ScanParams,
) -> Result<Option<Candidate>, SigtraderError> {
    require_bars(symbol, series, params.min_scan_bars)?;

    let start = series.len().saturating_sub(params.breakout_lookback_bars.max(1));
    let period_high = series[start..]
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let current_price = series[series.len() - 1].close;
    if current_price <= 0.0 || !period_high.is_finite() {
        return Ok(None);
    }

    let distance = (period_high - current_price) / current_price;
    if !(0.0..=params.candidate_proximity).contains(&distance) {
        return Ok(None);
    }

    let rsi = rsi(series, DEFAULT_RSI_PERIOD);
    let volatility = volatility(series, DEFAULT_VOLATILITY_PERIOD);
    Ok(Some(Candidate {
        symbol: symbol.to_string(),
        kind: CandidateKind::Breakout,
        current_price,
        reference_level: period_high,
        distance_pct: distance * 100.0,
        rsi,
        volatility,
        detected: detect_breakout(series, &params.breakout),
        quality_score: breakout_quality(series, rsi, volatility, &params.breakout),
        target: None,
        near_level: near_any_level(series, current_price, &params.levels),
    }))
}

/// Mean-reversion candidate check on a daily series: price at or below
/// `lower × (1 + candidate_proximity)`.
pub fn evaluate_mean_reversion(
    symbol: &str,
    series: &[Bar],
    params: &ScanParams,
) -> Result<Option<Candidate>, SigtraderError> {
    let mr = &params.mean_reversion;
    require_bars(symbol, series, mr.window + MEAN_REVERSION_EXTRA_BARS)?;

    let Some(bands) = bollinger_bands(series, mr.window, mr.k)
        .last()
        .copied()
        .flatten()
    else {
        return Ok(None);
    };
    let current_price = series[series.len() - 1].close;
    if current_price > bands.lower * (1.0 + params.candidate_proximity) {
        return Ok(None);
    }

    let distance_pct = if bands.lower != 0.0 {
        (current_price - bands.lower) / bands.lower * 100.0
    } else {
        0.0
    };
    Ok(Some(Candidate {
        symbol: symbol.to_string(),
        kind: CandidateKind::MeanReversion,
        current_price,
        reference_level: bands.lower,
        distance_pct,
        rsi: rsi(series, mr.rsi_period),
        volatility: volatility(series, DEFAULT_VOLATILITY_PERIOD),
        detected: detect_mean_reversion(series, mr).is_some(),
        quality_score: mean_reversion_quality(series, mr),
        target: Some(bands.middle),
        near_level: near_any_level(series, current_price, &params.levels),
    }))
}

fn scan_with<F>(
    data: &dyn DataPort,
    symbols: &[String],
    interval: Interval,
    limit: usize,
    evaluate: F,
) -> ScanOutcome
where
    F: Fn(&str, &[Bar]) -> Result<Option<Candidate>, SigtraderError>,
{
    let mut outcome = ScanOutcome::default();

    for symbol in symbols {
        let result = data
            .fetch_series(symbol, interval, limit)
            .and_then(|series| evaluate(symbol, &series));
        match result {
            Ok(Some(candidate)) => {
                debug!(
                    "{symbol}: candidate at {:.2} (score {:.1})",
                    candidate.current_price, candidate.quality_score
                );
                outcome.candidates.push(candidate);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Skipping {symbol}: {e}");
                outcome.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: e.into(),
                });
            }
        }
    }

    outcome
        .candidates
        .sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
    outcome
}

pub fn scan_breakouts(data: &dyn DataPort, symbols: &[String], params: &ScanParams) -> ScanOutcome {
    info!("Scanning {} symbols for breakouts", symbols.len());
    scan_with(
        data,
        symbols,
        Interval::FiveMinute,
        params.series_limit,
        |symbol, series| evaluate_breakout(symbol, series, params),
    )
}

pub fn scan_mean_reversion(
    data: &dyn DataPort,
    symbols: &[String],
    params: &ScanParams,
) -> ScanOutcome {
    info!("Scanning {} symbols for mean reversion", symbols.len());
    scan_with(
        data,
        symbols,
        Interval::Daily,
        params.daily_series_limit,
        |symbol, series| evaluate_mean_reversion(symbol, series, params),
    )
}

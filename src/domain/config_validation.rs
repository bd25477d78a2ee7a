//! Configuration loading and validation.
//!
//! Turns a `ConfigPort` into a typed `BotConfig`. Absent keys take their
//! defaults; present but malformed or out-of-range values are errors,
//! since bad configuration is the one fatal startup condition.

use crate::domain::engine::{SizingConfig, StrategyToggles};
use crate::domain::error::SigtraderError;
use crate::domain::risk::RiskConfig;
use crate::domain::scanner::ScanParams;
use crate::domain::watchlist::{Watchlist, parse_codes};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveTime;
use std::str::FromStr;

pub const DEFAULT_STARTING_CAPITAL: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub starting_capital: f64,
    pub risk: RiskConfig,
    pub sizing: SizingConfig,
    pub scan: ScanParams,
    pub strategies: StrategyToggles,
    pub market_close: NaiveTime,
    pub watchlist: Watchlist,
}

pub fn default_market_close() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 55, 0).unwrap_or_default()
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            starting_capital: DEFAULT_STARTING_CAPITAL,
            risk: RiskConfig::default(),
            sizing: SizingConfig::default(),
            scan: ScanParams::default(),
            strategies: StrategyToggles::default(),
            market_close: default_market_close(),
            watchlist: Watchlist::default(),
        }
    }
}

pub fn build_bot_config(config: &dyn ConfigPort) -> Result<BotConfig, SigtraderError> {
    let defaults = BotConfig::default();
    Ok(BotConfig {
        starting_capital: positive(config, "account", "starting_capital", defaults.starting_capital)?,
        risk: build_risk(config, &defaults.risk)?,
        sizing: build_sizing(config, &defaults.sizing)?,
        scan: build_scan(config, &defaults.scan)?,
        strategies: build_strategies(config, &defaults.strategies)?,
        market_close: build_market_close(config, defaults.market_close)?,
        watchlist: build_watchlist(config)?,
    })
}

/// Parse a present key as `T`; `Ok(None)` when the key is absent.
fn parse_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    kind: &str,
) -> Result<Option<T>, SigtraderError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| SigtraderError::config_invalid(section, key, format!("'{raw}' is not {kind}")))
}

fn number(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, SigtraderError> {
    match parse_key::<f64>(config, section, key, "a number")? {
        None => Ok(default),
        Some(value) if value.is_finite() => Ok(value),
        Some(value) => Err(SigtraderError::config_invalid(
            section,
            key,
            format!("'{value}' is not a finite number"),
        )),
    }
}

fn positive(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, SigtraderError> {
    let value = number(config, section, key, default)?;
    if value <= 0.0 {
        return Err(SigtraderError::config_invalid(
            section,
            key,
            format!("{key} must be positive"),
        ));
    }
    Ok(value)
}

/// A fraction in the open interval (0, 1), or (0, 1] when `inclusive`.
fn fraction(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
    inclusive: bool,
) -> Result<f64, SigtraderError> {
    let value = number(config, section, key, default)?;
    let in_range = value > 0.0 && (value < 1.0 || (inclusive && value == 1.0));
    if !in_range {
        let upper = if inclusive { "1]" } else { "1)" };
        return Err(SigtraderError::config_invalid(
            section,
            key,
            format!("{key} must be in (0, {upper}"),
        ));
    }
    Ok(value)
}

fn count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
    minimum: usize,
) -> Result<usize, SigtraderError> {
    let Some(value) = parse_key::<i64>(config, section, key, "an integer")? else {
        return Ok(default);
    };
    match usize::try_from(value) {
        Ok(v) if v >= minimum => Ok(v),
        _ => Err(SigtraderError::config_invalid(
            section,
            key,
            format!("{key} must be at least {minimum}"),
        )),
    }
}

fn flag(config: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, SigtraderError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    let as_true = config.get_bool(section, key, true);
    let as_false = config.get_bool(section, key, false);
    if as_true != as_false {
        return Err(SigtraderError::config_invalid(
            section,
            key,
            format!("'{raw}' is not a boolean"),
        ));
    }
    Ok(as_true)
}

fn build_risk(config: &dyn ConfigPort, defaults: &RiskConfig) -> Result<RiskConfig, SigtraderError> {
    Ok(RiskConfig {
        max_risk_per_trade: positive(config, "risk", "max_risk_per_trade", defaults.max_risk_per_trade)?,
        stop_loss_pct: fraction(config, "risk", "stop_loss_pct", defaults.stop_loss_pct, false)?,
        trailing_stop_pct: fraction(
            config,
            "risk",
            "trailing_stop_pct",
            defaults.trailing_stop_pct,
            false,
        )?,
        max_daily_loss_pct: fraction(
            config,
            "risk",
            "max_daily_loss_pct",
            defaults.max_daily_loss_pct,
            true,
        )?,
    })
}

fn build_sizing(config: &dyn ConfigPort, defaults: &SizingConfig) -> Result<SizingConfig, SigtraderError> {
    let sizing = SizingConfig {
        min_amount: positive(config, "sizing", "min_amount", defaults.min_amount)?,
        max_amount: positive(config, "sizing", "max_amount", defaults.max_amount)?,
        cash_fraction: fraction(config, "sizing", "cash_fraction", defaults.cash_fraction, true)?,
        cash_cap_fraction: fraction(
            config,
            "sizing",
            "cash_cap_fraction",
            defaults.cash_cap_fraction,
            true,
        )?,
        mean_reversion_min_amount: positive(
            config,
            "sizing",
            "mean_reversion_min_amount",
            defaults.mean_reversion_min_amount,
        )?,
        mean_reversion_max_amount: positive(
            config,
            "sizing",
            "mean_reversion_max_amount",
            defaults.mean_reversion_max_amount,
        )?,
    };
    if sizing.max_amount < sizing.min_amount {
        return Err(SigtraderError::config_invalid(
            "sizing",
            "max_amount",
            "max_amount must not be below min_amount",
        ));
    }
    if sizing.mean_reversion_max_amount < sizing.mean_reversion_min_amount {
        return Err(SigtraderError::config_invalid(
            "sizing",
            "mean_reversion_max_amount",
            "mean_reversion_max_amount must not be below mean_reversion_min_amount",
        ));
    }
    Ok(sizing)
}

fn build_scan(config: &dyn ConfigPort, defaults: &ScanParams) -> Result<ScanParams, SigtraderError> {
    const S: &str = "detection";
    let mut scan = *defaults;

    scan.breakout.period = count(config, S, "breakout_period", defaults.breakout.period, 1)?;
    scan.breakout.volume_surge_multiple = positive(
        config,
        S,
        "volume_surge_multiple",
        defaults.breakout.volume_surge_multiple,
    )?;
    scan.mean_reversion.window = count(
        config,
        S,
        "mean_reversion_window",
        defaults.mean_reversion.window,
        2,
    )?;
    scan.mean_reversion.k = positive(config, S, "bollinger_k", defaults.mean_reversion.k)?;
    scan.levels.window = count(config, S, "level_window", defaults.levels.window, 1)?;
    scan.levels.cluster_threshold = fraction(
        config,
        S,
        "level_cluster_threshold",
        defaults.levels.cluster_threshold,
        false,
    )?;
    scan.levels.proximity_threshold = fraction(
        config,
        S,
        "level_proximity_threshold",
        defaults.levels.proximity_threshold,
        false,
    )?;
    scan.min_scan_bars = count(config, S, "min_scan_bars", defaults.min_scan_bars, 1)?;
    scan.candidate_proximity = fraction(
        config,
        S,
        "candidate_proximity",
        defaults.candidate_proximity,
        false,
    )?;
    scan.breakout_lookback_bars = count(
        config,
        S,
        "breakout_lookback_bars",
        defaults.breakout_lookback_bars,
        1,
    )?;
    scan.series_limit = count(config, S, "series_limit", defaults.series_limit, scan.min_scan_bars)?;
    scan.daily_series_limit = count(
        config,
        S,
        "daily_series_limit",
        defaults.daily_series_limit,
        scan.mean_reversion.window,
    )?;
    Ok(scan)
}

fn build_strategies(
    config: &dyn ConfigPort,
    defaults: &StrategyToggles,
) -> Result<StrategyToggles, SigtraderError> {
    Ok(StrategyToggles {
        sentiment: flag(config, "strategies", "sentiment", defaults.sentiment)?,
        breakout: flag(config, "strategies", "breakout", defaults.breakout)?,
        mean_reversion: flag(config, "strategies", "mean_reversion", defaults.mean_reversion)?,
    })
}

fn build_market_close(config: &dyn ConfigPort, default: NaiveTime) -> Result<NaiveTime, SigtraderError> {
    match config.get_string("schedule", "market_close") {
        None => Ok(default),
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
            SigtraderError::config_invalid(
                "schedule",
                "market_close",
                "invalid market_close format, expected HH:MM",
            )
        }),
    }
}

/// Every key of `[watchlist]` is a sector; its value a code list. An
/// absent or empty section yields the built-in watchlist.
fn build_watchlist(config: &dyn ConfigPort) -> Result<Watchlist, SigtraderError> {
    let sectors = config.keys("watchlist");
    if sectors.is_empty() {
        return Ok(Watchlist::default());
    }

    let mut parsed = Vec::with_capacity(sectors.len());
    for sector in sectors {
        let raw = config.get_string("watchlist", &sector).unwrap_or_default();
        let codes = parse_codes(&raw)
            .map_err(|e| SigtraderError::config_invalid("watchlist", &sector, e.to_string()))?;
        parsed.push((sector, codes));
    }
    Watchlist::from_sectors(parsed)
        .map_err(|e| SigtraderError::config_invalid("watchlist", "*", e.to_string()))
}

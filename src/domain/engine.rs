//! Strategy cycle driver.
//!
//! One `run_cycle` call runs the enabled entry strategies over the
//! watchlist, then position maintenance, then the market-close sweep, and
//! finally forwards new ledger records to the sink. The engine owns the
//! single `RiskManager`; every position and cash mutation goes through it.

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::domain::bar::Interval;
use crate::domain::config_validation::BotConfig;
use crate::domain::error::TradeError;
use crate::domain::indicator::{DEFAULT_RSI_PERIOD, rsi};
use crate::domain::ledger::TradeRecord;
use crate::domain::pattern::{detect_breakout, detect_mean_reversion};
use crate::domain::position::{CloseReason, StrategyTag};
use crate::domain::risk::{BuyRequest, MaintenanceEvent, RiskManager};
use crate::domain::scanner::{SkipReason, SkippedSymbol};
use crate::ports::data_port::DataPort;
use crate::ports::ledger_port::LedgerPort;
use crate::ports::order_port::OrderPort;
use crate::ports::price_port::PricePort;
use crate::ports::sentiment_port::SentimentPort;

pub const SENTIMENT_BUY_THRESHOLD: f64 = 0.5;
pub const MIN_POST_VOLUME: u64 = 100;
pub const BREAKOUT_MIN_RSI: f64 = 60.0;
/// Live price must be within this fraction of a mean-reversion signal's entry.
pub const SIGNAL_PRICE_TOLERANCE: f64 = 0.01;
/// Premarket gaps larger than this (percent) are reported.
pub const GAP_THRESHOLD_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingConfig {
    pub min_amount: f64,
    pub max_amount: f64,
    pub cash_fraction: f64,
    pub cash_cap_fraction: f64,
    pub mean_reversion_min_amount: f64,
    pub mean_reversion_max_amount: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            min_amount: 20.0,
            max_amount: 50.0,
            cash_fraction: 0.2,
            cash_cap_fraction: 0.5,
            mean_reversion_min_amount: 100.0,
            mean_reversion_max_amount: 500.0,
        }
    }
}

impl SizingConfig {
    /// `min(max(floor, cash × fraction), min(ceiling, cash × cap_fraction))`
    pub fn amount(&self, cash: f64, strategy: StrategyTag) -> f64 {
        let (floor, ceiling) = match strategy {
            StrategyTag::MeanReversion => {
                (self.mean_reversion_min_amount, self.mean_reversion_max_amount)
            }
            _ => (self.min_amount, self.max_amount),
        };
        (floor.max(cash * self.cash_fraction)).min(ceiling.min(cash * self.cash_cap_fraction))
    }
}

/// Which entry strategies run. Passed in with the config rather than held
/// as process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyToggles {
    pub sentiment: bool,
    pub breakout: bool,
    pub mean_reversion: bool,
}

impl Default for StrategyToggles {
    fn default() -> Self {
        StrategyToggles {
            sentiment: true,
            breakout: true,
            mean_reversion: false,
        }
    }
}

impl StrategyToggles {
    pub fn enabled(&self, strategy: StrategyTag) -> bool {
        match strategy {
            StrategyTag::Sentiment => self.sentiment,
            StrategyTag::Breakout => self.breakout,
            StrategyTag::MeanReversion => self.mean_reversion,
        }
    }
}

/// External collaborators a cycle talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub data: &'a dyn DataPort,
    pub prices: &'a dyn PricePort,
    pub orders: &'a dyn OrderPort,
    pub sentiment: &'a dyn SentimentPort,
    pub ledger: &'a dyn LedgerPort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub symbol: String,
    pub error: TradeError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub buys: Vec<TradeRecord>,
    pub sells: Vec<TradeRecord>,
    pub rejections: Vec<Rejection>,
    pub skipped: Vec<SkippedSymbol>,
    pub trailing_stops_raised: usize,
    pub market_close: bool,
    pub records_forwarded: usize,
    pub account_value: f64,
    pub daily_pl: f64,
}

impl CycleReport {
    fn skip(&mut self, symbol: &str, reason: SkipReason) {
        self.skipped.push(SkippedSymbol {
            symbol: symbol.to_string(),
            reason,
        });
    }

    fn absorb(&mut self, events: Vec<MaintenanceEvent>) {
        for event in events {
            match event {
                MaintenanceEvent::Closed(outcome) => self.sells.push(outcome.record),
                MaintenanceEvent::TrailingStopRaised { .. } => self.trailing_stops_raised += 1,
                MaintenanceEvent::NoPrice { symbol } => self.skip(&symbol, SkipReason::NoPrice),
                MaintenanceEvent::SellFailed { symbol, error } => {
                    self.rejections.push(Rejection { symbol, error })
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapDirection {
    Up,
    Down,
}

impl std::fmt::Display for GapDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapDirection::Up => write!(f, "up"),
            GapDirection::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gap {
    pub symbol: String,
    pub sector: String,
    pub gap_pct: f64,
    pub direction: GapDirection,
}

pub struct TradingEngine {
    config: BotConfig,
    risk: RiskManager,
    forwarded: usize,
}

impl TradingEngine {
    pub fn new(config: BotConfig) -> Self {
        let risk = RiskManager::new(config.starting_capital, config.risk);
        TradingEngine {
            config,
            risk,
            forwarded: 0,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn set_strategies(&mut self, strategies: StrategyToggles) {
        info!("Updated strategy settings: {strategies:?}");
        self.config.strategies = strategies;
    }

    /// Reset daily stats and report premarket gaps against the previous
    /// daily close.
    pub fn open_day(&mut self, ports: &Collaborators<'_>, now: NaiveDateTime) -> Vec<Gap> {
        let value = self.risk.account_value(ports.prices);
        self.risk.reset_day(value);
        info!("Daily stats reset at {now}. Starting value: ${value:.2}");

        let mut gaps = Vec::new();
        for (sector, symbols) in self.config.watchlist.sectors() {
            for symbol in symbols {
                let Some(price) = ports.prices.current_price(symbol) else {
                    continue;
                };
                let bars = match ports.data.fetch_series(symbol, Interval::Daily, 2) {
                    Ok(bars) => bars,
                    Err(e) => {
                        warn!("Premarket scan skipping {symbol}: {e}");
                        continue;
                    }
                };
                if bars.len() < 2 {
                    continue;
                }
                let prev_close = bars[bars.len() - 2].close;
                if prev_close == 0.0 {
                    continue;
                }
                let gap_pct = (price - prev_close) / prev_close * 100.0;
                if gap_pct.abs() > GAP_THRESHOLD_PCT {
                    let direction = if gap_pct > 0.0 {
                        GapDirection::Up
                    } else {
                        GapDirection::Down
                    };
                    info!("Premarket gap detected: {symbol} {direction} {gap_pct:.2}%");
                    gaps.push(Gap {
                        symbol: symbol.clone(),
                        sector: sector.clone(),
                        gap_pct,
                        direction,
                    });
                }
            }
        }
        gaps
    }

    pub fn run_cycle(&mut self, ports: &Collaborators<'_>, now: NaiveDateTime) -> CycleReport {
        let mut report = CycleReport::default();
        let symbols = self.config.watchlist.symbols();

        if self.config.strategies.sentiment {
            self.run_sentiment(ports, &symbols, now, &mut report);
        }
        if self.config.strategies.breakout {
            self.run_breakout(ports, &symbols, now, &mut report);
        }
        if self.config.strategies.mean_reversion {
            self.run_mean_reversion(ports, &symbols, now, &mut report);
        }

        let events = self.risk.maintain(ports.prices, ports.orders, now);
        report.absorb(events);

        if now.time() >= self.config.market_close {
            report.market_close = true;
            let events =
                self.risk
                    .liquidate_all(ports.prices, ports.orders, CloseReason::MarketClose, now);
            report.absorb(events);
        }

        report.records_forwarded = self.forward_ledger(ports.ledger);
        report.account_value = self.risk.account_value(ports.prices);
        report.daily_pl = self.risk.state().daily_pl;
        info!(
            "Account value: ${:.2}, cash: ${:.2}, daily P&L: ${:.2}, open positions: {}",
            report.account_value,
            self.risk.cash(),
            report.daily_pl,
            self.risk.position_count()
        );
        report
    }

    fn try_buy(
        &mut self,
        ports: &Collaborators<'_>,
        symbol: &str,
        price: f64,
        strategy: StrategyTag,
        now: NaiveDateTime,
        report: &mut CycleReport,
    ) {
        let request = BuyRequest {
            symbol: symbol.to_string(),
            price,
            amount: self.config.sizing.amount(self.risk.cash(), strategy),
            strategy,
        };
        match self.risk.buy(ports.orders, &request, now) {
            Ok(record) => report.buys.push(record),
            Err(error) => report.rejections.push(Rejection {
                symbol: symbol.to_string(),
                error,
            }),
        }
    }

    fn run_sentiment(
        &mut self,
        ports: &Collaborators<'_>,
        symbols: &[String],
        now: NaiveDateTime,
        report: &mut CycleReport,
    ) {
        info!("Running sentiment strategy...");
        for symbol in symbols {
            let Some(reading) = ports.sentiment.reading(symbol) else {
                debug!("No sentiment reading for {symbol}");
                continue;
            };
            if !reading.is_valid() {
                warn!(
                    "Ignoring out-of-range sentiment {} for {symbol}",
                    reading.sentiment
                );
                continue;
            }
            info!(
                "{symbol} sentiment: {:.2}, post volume: {}",
                reading.sentiment, reading.post_volume
            );
            if reading.sentiment > SENTIMENT_BUY_THRESHOLD && reading.post_volume > MIN_POST_VOLUME
            {
                match ports.prices.current_price(symbol) {
                    Some(price) => {
                        self.try_buy(ports, symbol, price, StrategyTag::Sentiment, now, report)
                    }
                    None => report.skip(symbol, SkipReason::NoPrice),
                }
            }
        }
    }

    fn run_breakout(
        &mut self,
        ports: &Collaborators<'_>,
        symbols: &[String],
        now: NaiveDateTime,
        report: &mut CycleReport,
    ) {
        info!("Running breakout strategy...");
        let params = self.config.scan.breakout;
        for symbol in symbols {
            let series =
                match ports
                    .data
                    .fetch_series(symbol, Interval::FiveMinute, self.config.scan.series_limit)
                {
                    Ok(series) => series,
                    Err(e) => {
                        warn!("Error processing breakout for {symbol}: {e}");
                        report.skip(symbol, e.into());
                        continue;
                    }
                };
            if series.len() <= params.period {
                report.skip(
                    symbol,
                    SkipReason::InsufficientBars {
                        bars: series.len(),
                        minimum: params.period + 1,
                    },
                );
                continue;
            }

            let is_breakout = detect_breakout(&series, &params);
            let rsi = rsi(&series, DEFAULT_RSI_PERIOD);
            info!("{symbol} breakout: {is_breakout}, RSI: {rsi:.1}");

            if is_breakout && rsi > BREAKOUT_MIN_RSI {
                match ports.prices.current_price(symbol) {
                    Some(price) => {
                        self.try_buy(ports, symbol, price, StrategyTag::Breakout, now, report)
                    }
                    None => report.skip(symbol, SkipReason::NoPrice),
                }
            }
        }
    }

    fn run_mean_reversion(
        &mut self,
        ports: &Collaborators<'_>,
        symbols: &[String],
        now: NaiveDateTime,
        report: &mut CycleReport,
    ) {
        info!("Running mean reversion strategy...");
        let params = self.config.scan.mean_reversion;
        for symbol in symbols {
            let series = match ports.data.fetch_series(
                symbol,
                Interval::Daily,
                self.config.scan.daily_series_limit,
            ) {
                Ok(series) => series,
                Err(e) => {
                    warn!("Error processing mean reversion for {symbol}: {e}");
                    report.skip(symbol, e.into());
                    continue;
                }
            };
            if series.len() < params.window {
                report.skip(
                    symbol,
                    SkipReason::InsufficientBars {
                        bars: series.len(),
                        minimum: params.window,
                    },
                );
                continue;
            }

            let Some(opportunity) = detect_mean_reversion(&series, &params) else {
                continue;
            };
            let Some(price) = ports.prices.current_price(symbol) else {
                report.skip(symbol, SkipReason::NoPrice);
                continue;
            };
            if opportunity.entry > 0.0
                && ((price - opportunity.entry) / opportunity.entry).abs() < SIGNAL_PRICE_TOLERANCE
            {
                self.try_buy(ports, symbol, price, StrategyTag::MeanReversion, now, report);
            } else {
                debug!(
                    "{symbol}: price ${price:.2} drifted from signal entry ${:.2}",
                    opportunity.entry
                );
            }
        }
    }

    /// Push ledger records not yet accepted by the sink. Stops at the first
    /// failure so the remainder is retried next cycle.
    fn forward_ledger(&mut self, sink: &dyn LedgerPort) -> usize {
        let pending = self.risk.ledger().since(self.forwarded);
        let mut sent = 0;
        for record in pending {
            if let Err(e) = sink.append(record) {
                error!("Ledger sink rejected record for {}: {e}", record.symbol);
                break;
            }
            sent += 1;
        }
        self.forwarded += sent;
        sent
    }
}

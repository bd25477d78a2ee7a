//! Position tracking.
//!
//! A position is either open (held in the risk manager's book) or closed
//! with a [`CloseReason`]; closing is terminal. Raising the trailing stop
//! mutates an open position and is not a state change.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyTag {
    Sentiment,
    Breakout,
    MeanReversion,
}

impl StrategyTag {
    pub const ALL: [StrategyTag; 3] = [
        StrategyTag::Sentiment,
        StrategyTag::Breakout,
        StrategyTag::MeanReversion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyTag::Sentiment => "sentiment",
            StrategyTag::Breakout => "breakout",
            StrategyTag::MeanReversion => "mean_reversion",
        }
    }

    /// Take-profit target as a multiple of the entry price.
    pub fn take_profit_multiple(&self) -> f64 {
        match self {
            StrategyTag::Sentiment => 1.5,
            StrategyTag::Breakout => 1.3,
            StrategyTag::MeanReversion => 1.1,
        }
    }

    pub fn uses_trailing_stop(&self) -> bool {
        matches!(self, StrategyTag::Breakout)
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sentiment" => Ok(StrategyTag::Sentiment),
            "breakout" => Ok(StrategyTag::Breakout),
            "mean_reversion" => Ok(StrategyTag::MeanReversion),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    StopLoss,
    TrailingStop,
    TakeProfit,
    MarketClose,
    Manual,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::StopLoss => "stop_loss",
            CloseReason::TrailingStop => "trailing_stop",
            CloseReason::TakeProfit => "take_profit",
            CloseReason::MarketClose => "market_close",
            CloseReason::Manual => "manual",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionStatus {
    Open,
    Closed(CloseReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub shares: f64,
    pub entry_price: f64,
    pub strategy: StrategyTag,
    pub trailing_stop: Option<f64>,
    pub opened_at: NaiveDateTime,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.shares * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, price: f64, stop_loss_pct: f64) -> bool {
        price <= self.entry_price * (1.0 - stop_loss_pct)
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        price >= self.entry_price * self.strategy.take_profit_multiple()
    }

    /// Whether the trailing stop is armed and `price` has hit it.
    pub fn should_trailing_stop(&self, price: f64) -> bool {
        self.strategy.uses_trailing_stop() && self.trailing_stop.is_some_and(|stop| price <= stop)
    }

    /// Raise the trailing stop once price clears the level the current stop
    /// was set from. Returns the new stop when it moved. Never lowers it.
    pub fn ratchet_trailing_stop(&mut self, price: f64, trailing_pct: f64) -> Option<f64> {
        if !self.strategy.uses_trailing_stop() {
            return None;
        }
        let stop = self.trailing_stop?;
        if price > stop / (1.0 - trailing_pct) {
            let raised = (price * (1.0 - trailing_pct)).max(stop);
            self.trailing_stop = Some(raised);
            return Some(raised);
        }
        None
    }

    /// Fold another fill into the position at the volume-weighted price.
    /// The latest strategy tag wins; a breakout fill arms the trailing stop
    /// at `price × (1 - trailing_pct)` unless an existing stop is higher.
    pub fn add_fill(&mut self, shares: f64, price: f64, strategy: StrategyTag, trailing_pct: f64) {
        let total = self.shares + shares;
        self.entry_price = (self.shares * self.entry_price + shares * price) / total;
        self.shares = total;
        self.strategy = strategy;
        if strategy.uses_trailing_stop() {
            let fresh = price * (1.0 - trailing_pct);
            self.trailing_stop = Some(self.trailing_stop.map_or(fresh, |s| s.max(fresh)));
        }
    }
}

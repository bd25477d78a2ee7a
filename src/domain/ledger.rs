//! Append-only trade ledger.
//!
//! One record per executed buy or sell. Records are never edited or
//! removed once appended.

use crate::domain::position::{CloseReason, StrategyTag};
use chrono::NaiveDateTime;
use std::fmt;

pub const LEDGER_HEADER: [&str; 8] = [
    "timestamp",
    "symbol",
    "action",
    "price",
    "shares",
    "pnl",
    "strategy",
    "cash_after",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeAction {
    Buy,
    Sell(CloseReason),
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell(reason) => write!(f, "SELL ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub action: TradeAction,
    pub price: f64,
    pub shares: f64,
    pub pnl: f64,
    pub strategy: StrategyTag,
    pub cash_after: f64,
}

impl TradeRecord {
    /// Field values in ledger column order.
    pub fn to_row(&self) -> [String; 8] {
        [
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.symbol.clone(),
            self.action.to_string(),
            format!("{:.4}", self.price),
            format!("{:.6}", self.shares),
            format!("{:.4}", self.pnl),
            self.strategy.to_string(),
            format!("{:.4}", self.cash_after),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    records: Vec<TradeRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, record: TradeRecord) -> &TradeRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    /// Records appended after the first `offset`.
    pub fn since(&self, offset: usize) -> &[TradeRecord] {
        &self.records[offset.min(self.records.len())..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.records.iter().map(|r| r.pnl).sum()
    }
}

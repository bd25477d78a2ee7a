//! Position & risk manager.
//!
//! Sole owner of the position book, cash and daily P&L. Every buy passes
//! three admission checks before an order is sent; an order failure leaves
//! state exactly as it was. Each executed trade appends one ledger record.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use super::error::{RiskViolation, TradeError};
use super::ledger::{Ledger, TradeAction, TradeRecord};
use super::position::{CloseReason, Position, PositionStatus, StrategyTag};
use crate::ports::order_port::{OrderPort, OrderRequest, OrderSide};
use crate::ports::price_port::PricePort;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskConfig {
    pub max_risk_per_trade: f64,
    pub stop_loss_pct: f64,
    pub trailing_stop_pct: f64,
    pub max_daily_loss_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_risk_per_trade: 50.0,
            stop_loss_pct: 0.05,
            trailing_stop_pct: 0.10,
            max_daily_loss_pct: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskState {
    pub cash: f64,
    pub daily_pl: f64,
    pub starting_day_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyRequest {
    pub symbol: String,
    pub price: f64,
    pub amount: f64,
    pub strategy: StrategyTag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellOutcome {
    pub record: TradeRecord,
    pub status: PositionStatus,
}

/// What per-cycle maintenance did for one position.
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceEvent {
    Closed(SellOutcome),
    TrailingStopRaised { symbol: String, stop: f64 },
    NoPrice { symbol: String },
    SellFailed { symbol: String, error: TradeError },
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    state: RiskState,
    positions: BTreeMap<String, Position>,
    ledger: Ledger,
}

impl RiskManager {
    pub fn new(starting_capital: f64, config: RiskConfig) -> Self {
        RiskManager {
            config,
            state: RiskState {
                cash: starting_capital,
                daily_pl: 0.0,
                starting_day_value: starting_capital,
            },
            positions: BTreeMap::new(),
            ledger: Ledger::new(),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn cash(&self) -> f64 {
        self.state.cash
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn daily_loss_limit(&self) -> f64 {
        self.config.max_daily_loss_pct * self.state.starting_day_value
    }

    pub fn circuit_breaker_tripped(&self) -> bool {
        self.state.daily_pl <= -self.daily_loss_limit()
    }

    /// Admission checks for a buy of `risk_amount`, in order: per-trade
    /// ceiling, daily-loss circuit breaker, available cash.
    pub fn check_buy(&self, risk_amount: f64) -> Result<(), RiskViolation> {
        if risk_amount > self.config.max_risk_per_trade {
            return Err(RiskViolation::ExceedsMaxRisk {
                requested: risk_amount,
                max: self.config.max_risk_per_trade,
            });
        }
        if self.circuit_breaker_tripped() {
            return Err(RiskViolation::DailyLossLimit {
                daily_pl: self.state.daily_pl,
                limit: self.daily_loss_limit(),
            });
        }
        if risk_amount > self.state.cash {
            return Err(RiskViolation::InsufficientCash {
                requested: risk_amount,
                available: self.state.cash,
            });
        }
        Ok(())
    }

    pub fn buy(
        &mut self,
        orders: &dyn OrderPort,
        request: &BuyRequest,
        now: NaiveDateTime,
    ) -> Result<TradeRecord, TradeError> {
        let BuyRequest {
            symbol,
            price,
            amount,
            strategy,
        } = request;
        let (price, amount, strategy) = (*price, *amount, *strategy);

        if !(price.is_finite() && price > 0.0) {
            return Err(TradeError::InvalidOrder {
                symbol: symbol.clone(),
                reason: format!("price must be positive, got {price}"),
            });
        }
        if !(amount.is_finite() && amount >= 0.0) {
            return Err(TradeError::InvalidOrder {
                symbol: symbol.clone(),
                reason: format!("amount must be positive, got {amount}"),
            });
        }

        // A zero amount comes from sizing against an empty account.
        let admission = self.check_buy(amount).and_then(|()| {
            if amount == 0.0 {
                Err(RiskViolation::InsufficientCash {
                    requested: amount,
                    available: self.state.cash,
                })
            } else {
                Ok(())
            }
        });
        if let Err(violation) = admission {
            info!("Buy of {symbol} rejected: {violation}");
            return Err(violation.into());
        }

        let shares = amount / price;
        let order = OrderRequest {
            symbol: symbol.clone(),
            side: OrderSide::Buy,
            shares,
        };
        if let Err(e) = orders.submit(&order) {
            error!("Error placing buy order for {symbol}: {e}");
            return Err(TradeError::OrderFailed {
                symbol: symbol.clone(),
                reason: e.to_string(),
            });
        }

        self.state.cash -= amount;
        let trailing_pct = self.config.trailing_stop_pct;
        match self.positions.get_mut(symbol) {
            Some(pos) => pos.add_fill(shares, price, strategy, trailing_pct),
            None => {
                let trailing_stop = strategy
                    .uses_trailing_stop()
                    .then(|| price * (1.0 - trailing_pct));
                self.positions.insert(
                    symbol.clone(),
                    Position {
                        symbol: symbol.clone(),
                        shares,
                        entry_price: price,
                        strategy,
                        trailing_stop,
                        opened_at: now,
                    },
                );
            }
        }

        let record = self
            .ledger
            .append(TradeRecord {
                timestamp: now,
                symbol: symbol.clone(),
                action: TradeAction::Buy,
                price,
                shares,
                pnl: 0.0,
                strategy,
                cash_after: self.state.cash,
            })
            .clone();
        info!(
            "TRADE: BUY {shares:.4} shares of {symbol} at ${price:.2} - {strategy} strategy"
        );
        Ok(record)
    }

    pub fn sell(
        &mut self,
        orders: &dyn OrderPort,
        symbol: &str,
        price: f64,
        shares: f64,
        reason: CloseReason,
        now: NaiveDateTime,
    ) -> Result<SellOutcome, TradeError> {
        let Some(held) = self.positions.get(symbol) else {
            error!("Attempted to sell {symbol} but no position found");
            return Err(TradeError::NoPosition {
                symbol: symbol.to_string(),
            });
        };
        if !(price.is_finite() && price > 0.0) || !(shares.is_finite() && shares > 0.0) {
            return Err(TradeError::InvalidOrder {
                symbol: symbol.to_string(),
                reason: format!("cannot sell {shares} shares at {price}"),
            });
        }

        let shares_sold = shares.min(held.shares);
        let order = OrderRequest {
            symbol: symbol.to_string(),
            side: OrderSide::Sell,
            shares: shares_sold,
        };
        if let Err(e) = orders.submit(&order) {
            error!("Error placing sell order for {symbol}: {e}");
            return Err(TradeError::OrderFailed {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            });
        }

        let (entry_price, strategy, fully_closed) =
            (held.entry_price, held.strategy, shares_sold >= held.shares);
        let pnl = (price - entry_price) * shares_sold;
        self.state.daily_pl += pnl;
        self.state.cash += shares_sold * price;

        let status = if fully_closed {
            self.positions.remove(symbol);
            PositionStatus::Closed(reason)
        } else {
            if let Some(pos) = self.positions.get_mut(symbol) {
                pos.shares -= shares_sold;
            }
            PositionStatus::Open
        };

        let record = self
            .ledger
            .append(TradeRecord {
                timestamp: now,
                symbol: symbol.to_string(),
                action: TradeAction::Sell(reason),
                price,
                shares: shares_sold,
                pnl,
                strategy,
                cash_after: self.state.cash,
            })
            .clone();
        info!(
            "TRADE: SELL ({reason}) {shares_sold:.4} shares of {symbol} at ${price:.2} - P&L ${pnl:.2}"
        );
        Ok(SellOutcome { record, status })
    }

    /// Sell the whole position.
    pub fn close(
        &mut self,
        orders: &dyn OrderPort,
        symbol: &str,
        price: f64,
        reason: CloseReason,
        now: NaiveDateTime,
    ) -> Result<SellOutcome, TradeError> {
        let shares = self
            .positions
            .get(symbol)
            .map(|p| p.shares)
            .ok_or_else(|| TradeError::NoPosition {
                symbol: symbol.to_string(),
            })?;
        self.sell(orders, symbol, price, shares, reason, now)
    }

    fn close_for_event(
        &mut self,
        orders: &dyn OrderPort,
        symbol: &str,
        price: f64,
        reason: CloseReason,
        now: NaiveDateTime,
    ) -> MaintenanceEvent {
        match self.close(orders, symbol, price, reason, now) {
            Ok(outcome) => MaintenanceEvent::Closed(outcome),
            Err(error) => MaintenanceEvent::SellFailed {
                symbol: symbol.to_string(),
                error,
            },
        }
    }

    /// Evaluate stop-loss, trailing stop and take-profit for every open
    /// position against its live price. Symbols without a price are left
    /// untouched this cycle.
    pub fn maintain(
        &mut self,
        prices: &dyn PricePort,
        orders: &dyn OrderPort,
        now: NaiveDateTime,
    ) -> Vec<MaintenanceEvent> {
        let symbols: Vec<String> = self.positions.keys().cloned().collect();
        let mut events = Vec::new();

        for symbol in symbols {
            let Some(price) = prices.current_price(&symbol) else {
                warn!("No price for {symbol}; skipping maintenance this cycle");
                events.push(MaintenanceEvent::NoPrice { symbol });
                continue;
            };
            let stop_loss_pct = self.config.stop_loss_pct;
            let trailing_pct = self.config.trailing_stop_pct;
            let Some(pos) = self.positions.get_mut(&symbol) else {
                continue;
            };

            if pos.should_stop_loss(price, stop_loss_pct) {
                info!("Stop loss triggered for {symbol} at ${price:.2}");
                events.push(self.close_for_event(orders, &symbol, price, CloseReason::StopLoss, now));
                continue;
            }

            if pos.should_trailing_stop(price) {
                info!("Trailing stop triggered for {symbol} at ${price:.2}");
                events.push(self.close_for_event(
                    orders,
                    &symbol,
                    price,
                    CloseReason::TrailingStop,
                    now,
                ));
                continue;
            }
            if let Some(stop) = pos.ratchet_trailing_stop(price, trailing_pct) {
                info!("Updated trailing stop for {symbol} to ${stop:.2}");
                events.push(MaintenanceEvent::TrailingStopRaised {
                    symbol: symbol.clone(),
                    stop,
                });
            }

            if pos.should_take_profit(price) {
                info!(
                    "Take profit triggered for {symbol} at ${price:.2} ({} strategy)",
                    pos.strategy
                );
                events.push(self.close_for_event(
                    orders,
                    &symbol,
                    price,
                    CloseReason::TakeProfit,
                    now,
                ));
            }
        }

        events
    }

    /// Close every position regardless of P&L. Symbols without a price
    /// stay open and are reported.
    pub fn liquidate_all(
        &mut self,
        prices: &dyn PricePort,
        orders: &dyn OrderPort,
        reason: CloseReason,
        now: NaiveDateTime,
    ) -> Vec<MaintenanceEvent> {
        info!("Liquidating all positions ({reason})");
        let symbols: Vec<String> = self.positions.keys().cloned().collect();
        symbols
            .into_iter()
            .map(|symbol| match prices.current_price(&symbol) {
                Some(price) => self.close_for_event(orders, &symbol, price, reason, now),
                None => {
                    warn!("No price for {symbol}; cannot liquidate this cycle");
                    MaintenanceEvent::NoPrice { symbol }
                }
            })
            .collect()
    }

    /// Cash plus open positions at live prices; a position without a live
    /// price is valued at its entry price.
    pub fn account_value(&self, prices: &dyn PricePort) -> f64 {
        let positions: f64 = self
            .positions
            .values()
            .map(|p| p.market_value(prices.current_price(&p.symbol).unwrap_or(p.entry_price)))
            .sum();
        self.state.cash + positions
    }

    /// Start a new trading day: zero the daily P&L and re-base the
    /// circuit breaker on `account_value`.
    pub fn reset_day(&mut self, account_value: f64) {
        self.state.daily_pl = 0.0;
        self.state.starting_day_value = account_value;
        debug!("Daily stats reset. Starting value: ${account_value:.2}");
    }
}

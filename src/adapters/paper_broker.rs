//! Offline broker: prices from recorded 5-minute series, orders always
//! fill. Submitted orders are kept for inspection.

use crate::domain::bar::Interval;
use crate::domain::error::SigtraderError;
use crate::ports::data_port::DataPort;
use crate::ports::order_port::{OrderPort, OrderRequest};
use crate::ports::price_port::PricePort;
use std::cell::RefCell;
use tracing::{debug, info};

pub struct PaperBroker<'a> {
    data: &'a dyn DataPort,
    fills: RefCell<Vec<OrderRequest>>,
}

impl<'a> PaperBroker<'a> {
    pub fn new(data: &'a dyn DataPort) -> Self {
        Self {
            data,
            fills: RefCell::new(Vec::new()),
        }
    }

    pub fn fills(&self) -> Vec<OrderRequest> {
        self.fills.borrow().clone()
    }
}

impl PricePort for PaperBroker<'_> {
    /// Last close of the symbol's 5-minute series.
    fn current_price(&self, symbol: &str) -> Option<f64> {
        match self.data.fetch_series(symbol, Interval::FiveMinute, 1) {
            Ok(bars) => bars.last().map(|b| b.close).filter(|p| *p > 0.0),
            Err(e) => {
                debug!("No paper price for {symbol}: {e}");
                None
            }
        }
    }
}

impl OrderPort for PaperBroker<'_> {
    fn submit(&self, order: &OrderRequest) -> Result<(), SigtraderError> {
        info!(
            "Paper {} order filled: {:.6} shares of {}",
            order.side, order.shares, order.symbol
        );
        self.fills.borrow_mut().push(order.clone());
        Ok(())
    }
}

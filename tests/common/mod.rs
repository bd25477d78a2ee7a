#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use sigtrader::domain::bar::{Bar, Interval};
use sigtrader::domain::error::SigtraderError;
use sigtrader::domain::ledger::TradeRecord;
use sigtrader::ports::data_port::DataPort;
use sigtrader::ports::ledger_port::LedgerPort;
use sigtrader::ports::order_port::{OrderPort, OrderRequest};
use sigtrader::ports::price_port::PricePort;
use sigtrader::ports::sentiment_port::{SentimentPort, SentimentReading};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<(String, Interval), Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, interval: Interval, bars: Vec<Bar>) -> Self {
        self.data.insert((symbol.to_string(), interval), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Bar>, SigtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SigtraderError::DataFetch {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(&(symbol.to_string(), interval))
            .cloned()
            .unwrap_or_default();
        let start = bars.len().saturating_sub(limit);
        Ok(bars[start..].to_vec())
    }
}

#[derive(Default)]
pub struct MockPriceFeed {
    pub prices: RefCell<HashMap<String, f64>>,
}

impl MockPriceFeed {
    pub fn with(self, symbol: &str, price: f64) -> Self {
        self.set(symbol, price);
        self
    }

    pub fn set(&self, symbol: &str, price: f64) {
        self.prices.borrow_mut().insert(symbol.to_string(), price);
    }
}

impl PricePort for MockPriceFeed {
    fn current_price(&self, symbol: &str) -> Option<f64> {
        self.prices.borrow().get(symbol).copied()
    }
}

#[derive(Default)]
pub struct MockOrderPort {
    pub submitted: RefCell<Vec<OrderRequest>>,
    pub fail: Cell<bool>,
}

impl MockOrderPort {
    pub fn failing() -> Self {
        let port = Self::default();
        port.fail.set(true);
        port
    }
}

impl OrderPort for MockOrderPort {
    fn submit(&self, order: &OrderRequest) -> Result<(), SigtraderError> {
        if self.fail.get() {
            return Err(SigtraderError::OrderRejected {
                reason: "broker unavailable".to_string(),
            });
        }
        self.submitted.borrow_mut().push(order.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockSentiment {
    pub readings: HashMap<String, SentimentReading>,
}

impl MockSentiment {
    pub fn with(mut self, symbol: &str, sentiment: f64, post_volume: u64) -> Self {
        self.readings.insert(
            symbol.to_string(),
            SentimentReading {
                sentiment,
                post_volume,
            },
        );
        self
    }
}

impl SentimentPort for MockSentiment {
    fn reading(&self, symbol: &str) -> Option<SentimentReading> {
        self.readings.get(symbol).copied()
    }
}

#[derive(Default)]
pub struct MockLedger {
    pub records: RefCell<Vec<TradeRecord>>,
    pub fail: Cell<bool>,
}

impl LedgerPort for MockLedger {
    fn append(&self, record: &TradeRecord) -> Result<(), SigtraderError> {
        if self.fail.get() {
            return Err(SigtraderError::Ledger {
                reason: "disk full".to_string(),
            });
        }
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn make_bar(index: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        timestamp: at(9, 30) + Duration::minutes(5 * index as i64),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Flat candles at the given closes, volume 1000.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c, c, c, 1000.0))
        .collect()
}

/// 24 bars climbing from 90 toward 100, then a high-volume bar closing at 104.5.
pub fn breakout_series() -> Vec<Bar> {
    let mut series: Vec<Bar> = (0..24)
        .map(|i| {
            let close = 90.0 + i as f64 * 0.4;
            make_bar(i, close - 0.2, close + 0.2, close - 0.3, close, 1000.0)
        })
        .collect();
    series.push(make_bar(24, 99.5, 105.0, 99.4, 104.5, 3000.0));
    series
}

/// Gently rising closes that end a little under the lookback high.
pub fn near_high_series(base: f64, bars: usize) -> Vec<Bar> {
    let mut closes: Vec<f64> = (0..bars).map(|i| base + i as f64 * 0.05).collect();
    if let Some(last) = closes.last_mut() {
        *last -= 0.5;
    }
    bars_from_closes(&closes)
}

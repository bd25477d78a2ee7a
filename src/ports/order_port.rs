//! Order execution port trait.

use crate::domain::error::SigtraderError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub shares: f64,
}

pub trait OrderPort {
    /// Submit a market order. The core only looks at success or failure.
    fn submit(&self, order: &OrderRequest) -> Result<(), SigtraderError>;
}

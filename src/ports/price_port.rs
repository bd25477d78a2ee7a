//! Live price port trait.

pub trait PricePort {
    /// Latest tradable price. `None` means "skip this symbol for the cycle".
    fn current_price(&self, symbol: &str) -> Option<f64>;
}

//! Bar series access port trait.

use crate::domain::bar::{Bar, Interval};
use crate::domain::error::SigtraderError;

pub trait DataPort {
    /// Up to `limit` most recent bars, oldest first.
    fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Bar>, SigtraderError>;
}

//! Trade ledger sink port trait.

use crate::domain::error::SigtraderError;
use crate::domain::ledger::TradeRecord;

/// Append-only destination for executed trades.
pub trait LedgerPort {
    fn append(&self, record: &TradeRecord) -> Result<(), SigtraderError>;
}

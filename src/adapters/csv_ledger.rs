//! CSV trade ledger sink.
//!
//! Appends one row per trade; the header is written when the file is new
//! or empty. Existing rows are never touched.

use crate::domain::error::SigtraderError;
use crate::domain::ledger::{LEDGER_HEADER, TradeRecord};
use crate::ports::ledger_port::LedgerPort;
use std::fs::OpenOptions;
use std::path::PathBuf;

pub struct CsvLedgerWriter {
    path: PathBuf,
}

impl CsvLedgerWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

fn ledger_err(e: impl std::fmt::Display) -> SigtraderError {
    SigtraderError::Ledger {
        reason: e.to_string(),
    }
}

impl LedgerPort for CsvLedgerWriter {
    fn append(&self, record: &TradeRecord) -> Result<(), SigtraderError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ledger_err(format!("failed to open {}: {e}", self.path.display())))?;
        let is_empty = file.metadata().map_err(ledger_err)?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(LEDGER_HEADER).map_err(ledger_err)?;
        }
        writer.write_record(record.to_row()).map_err(ledger_err)?;
        writer.flush().map_err(ledger_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::TradeAction;
    use crate::domain::position::{CloseReason, StrategyTag};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn record(action: TradeAction, pnl: f64) -> TradeRecord {
        TradeRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 15, 0)
                .unwrap(),
            symbol: "TSLA".into(),
            action,
            price: 200.0,
            shares: 0.25,
            pnl,
            strategy: StrategyTag::Sentiment,
            cash_after: 50.0,
        }
    }

    #[test]
    fn writes_header_once_then_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let writer = CsvLedgerWriter::new(path.clone());

        writer.append(&record(TradeAction::Buy, 0.0)).unwrap();
        writer
            .append(&record(TradeAction::Sell(CloseReason::TakeProfit), 25.0))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,symbol,action,price,shares,pnl,strategy,cash_after"
        );
        assert_eq!(
            lines[1],
            "2024-03-01 10:15:00,TSLA,BUY,200.0000,0.250000,0.0000,sentiment,50.0000"
        );
        assert!(lines[2].contains("SELL (take_profit)"));
    }

    #[test]
    fn unwritable_path_is_ledger_error() {
        let dir = TempDir::new().unwrap();
        let writer = CsvLedgerWriter::new(dir.path().join("missing").join("trades.csv"));
        assert!(matches!(
            writer.append(&record(TradeAction::Buy, 0.0)),
            Err(SigtraderError::Ledger { .. })
        ));
    }
}

//! CSV file bar-series adapter.
//!
//! Reads `<dir>/<SYMBOL>_<interval>.csv` with columns
//! `timestamp,open,high,low,close,volume`. Timestamps are
//! `YYYY-MM-DD HH:MM:SS` or, for daily files, plain `YYYY-MM-DD`.

use crate::domain::bar::{Bar, Interval};
use crate::domain::error::SigtraderError;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol, interval.as_str()))
    }

    /// Symbols with a series file for `interval`, sorted.
    pub fn list_symbols(&self, interval: Interval) -> Result<Vec<String>, SigtraderError> {
        let entries = fs::read_dir(&self.base_path)?;
        let suffix = format!("_{}.csv", interval.as_str());
        let mut symbols = Vec::new();

        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_bar(symbol: &str, record: &csv::StringRecord) -> Result<Bar, SigtraderError> {
    let fetch_err = |reason: String| SigtraderError::DataFetch {
        symbol: symbol.to_string(),
        reason,
    };
    let field = |index: usize, name: &str| -> Result<f64, SigtraderError> {
        record
            .get(index)
            .ok_or_else(|| fetch_err(format!("missing {name} column")))?
            .trim()
            .parse()
            .map_err(|e| fetch_err(format!("invalid {name} value: {e}")))
    };

    let raw_ts = record
        .get(0)
        .ok_or_else(|| fetch_err("missing timestamp column".into()))?;
    let timestamp =
        parse_timestamp(raw_ts).ok_or_else(|| fetch_err(format!("invalid timestamp '{raw_ts}'")))?;

    Ok(Bar {
        timestamp,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
    })
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Bar>, SigtraderError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path).map_err(|e| SigtraderError::DataFetch {
            symbol: symbol.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| SigtraderError::DataFetch {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {e}"),
            })?;
            bars.push(parse_bar(symbol, &record)?);
        }

        bars.sort_by_key(|b| b.timestamp);
        let start = bars.len().saturating_sub(limit);
        Ok(bars.split_off(start))
    }
}

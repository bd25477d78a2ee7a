//! CSV sentiment feed.
//!
//! Loads `symbol,sentiment,post_volume` rows once; later rows for the same
//! symbol replace earlier ones.

use crate::domain::error::SigtraderError;
use crate::ports::sentiment_port::{SentimentPort, SentimentReading};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Default)]
pub struct CsvSentimentAdapter {
    readings: HashMap<String, SentimentReading>,
}

impl CsvSentimentAdapter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SigtraderError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| SigtraderError::DataFetch {
            symbol: "*".into(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SigtraderError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut readings = HashMap::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SigtraderError::DataFetch {
                symbol: "*".into(),
                reason: format!("CSV parse error: {e}"),
            })?;
            let symbol = record.get(0).unwrap_or_default().trim().to_uppercase();
            let sentiment = record.get(1).and_then(|v| v.trim().parse::<f64>().ok());
            let post_volume = record.get(2).and_then(|v| v.trim().parse::<u64>().ok());

            match (symbol.is_empty(), sentiment, post_volume) {
                (false, Some(sentiment), Some(post_volume)) => {
                    readings.insert(
                        symbol,
                        SentimentReading {
                            sentiment,
                            post_volume,
                        },
                    );
                }
                _ => warn!("Skipping malformed sentiment row: {record:?}"),
            }
        }

        Ok(Self { readings })
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl SentimentPort for CsvSentimentAdapter {
    fn reading(&self, symbol: &str) -> Option<SentimentReading> {
        self.readings.get(symbol).copied()
    }
}

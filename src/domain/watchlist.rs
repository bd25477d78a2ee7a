//! Sector-grouped symbol watchlist.
//!
//! Codes are parsed from comma-separated lists (one per sector in the
//! `[watchlist]` config section), trimmed and upper-cased.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WatchlistError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    #[error("watchlist has no symbols")]
    Empty,
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, WatchlistError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(WatchlistError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(WatchlistError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Watchlist {
    sectors: Vec<(String, Vec<String>)>,
}

const BUILTIN: [(&str, [&str; 5]); 3] = [
    ("tech", ["AAPL", "NVDA", "AMD", "TSLA", "MSFT"]),
    ("consumer", ["NKE", "SBUX", "AMZN", "WMT", "DIS"]),
    ("healthcare", ["JNJ", "PFE", "MRNA", "ABBV", "UNH"]),
];

/// Five high-volume names in each of three sectors.
impl Default for Watchlist {
    fn default() -> Self {
        Watchlist {
            sectors: BUILTIN
                .iter()
                .map(|(sector, codes)| {
                    (
                        sector.to_string(),
                        codes.iter().map(|c| c.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl Watchlist {
    /// Build from `(sector, codes)` pairs. A symbol listed under two
    /// sectors is rejected.
    pub fn from_sectors(sectors: Vec<(String, Vec<String>)>) -> Result<Self, WatchlistError> {
        let mut seen = HashSet::new();
        for code in sectors.iter().flat_map(|(_, codes)| codes) {
            if !seen.insert(code.as_str()) {
                return Err(WatchlistError::DuplicateCode(code.clone()));
            }
        }
        if seen.is_empty() {
            return Err(WatchlistError::Empty);
        }
        Ok(Watchlist { sectors })
    }

    pub fn sectors(&self) -> &[(String, Vec<String>)] {
        &self.sectors
    }

    /// All symbols in sector order.
    pub fn symbols(&self) -> Vec<String> {
        self.sectors
            .iter()
            .flat_map(|(_, codes)| codes.iter().cloned())
            .collect()
    }

    pub fn sector_of(&self, symbol: &str) -> Option<&str> {
        self.sectors
            .iter()
            .find(|(_, codes)| codes.iter().any(|c| c == symbol))
            .map(|(sector, _)| sector.as_str())
    }

    pub fn count(&self) -> usize {
        self.sectors.iter().map(|(_, codes)| codes.len()).sum()
    }
}

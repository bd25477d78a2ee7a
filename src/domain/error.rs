//! Domain error types.

/// Buy admission failures. These are business outcomes, not faults:
/// the request is refused and no state changes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskViolation {
    #[error("risk amount ${requested:.2} exceeds maximum ${max:.2}")]
    ExceedsMaxRisk { requested: f64, max: f64 },

    #[error("daily loss limit reached: P&L ${daily_pl:.2}, limit -${limit:.2}")]
    DailyLossLimit { daily_pl: f64, limit: f64 },

    #[error("insufficient cash: need ${requested:.2}, have ${available:.2}")]
    InsufficientCash { requested: f64, available: f64 },
}

/// Why a buy or sell attempt did not complete.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("buy rejected: {0}")]
    Rejected(#[from] RiskViolation),

    #[error("invalid order for {symbol}: {reason}")]
    InvalidOrder { symbol: String, reason: String },

    #[error("no open position for {symbol}")]
    NoPosition { symbol: String },

    #[error("order for {symbol} failed: {reason}")]
    OrderFailed { symbol: String, reason: String },
}

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum SigtraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data fetch failed for {symbol}: {reason}")]
    DataFetch { symbol: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("order rejected by broker: {reason}")]
    OrderRejected { reason: String },

    #[error("ledger write failed: {reason}")]
    Ledger { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SigtraderError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SigtraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SigtraderError> for std::process::ExitCode {
    fn from(err: &SigtraderError) -> Self {
        let code: u8 = match err {
            SigtraderError::Io(_) => 1,
            SigtraderError::ConfigParse { .. }
            | SigtraderError::ConfigMissing { .. }
            | SigtraderError::ConfigInvalid { .. } => 2,
            SigtraderError::DataFetch { .. }
            | SigtraderError::NoData { .. }
            | SigtraderError::InsufficientData { .. } => 3,
            SigtraderError::OrderRejected { .. } | SigtraderError::Ledger { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

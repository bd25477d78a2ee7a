//! Windowed indicators over a bar series.
//!
//! Every indicator comes in two flavours:
//! - `try_*` returns `Result<f64, IndicatorError>` so callers can tell
//!   "not enough bars" apart from "degenerate arithmetic"
//! - the plain function applies the documented fallback and never fails
//!
//! All indicators read the trailing window ending at the last bar.

pub mod atr;
pub mod bollinger;
pub mod rsi;
pub mod stddev;
pub mod volatility;
pub mod volume;

pub use atr::{atr, try_atr};
pub use bollinger::{Bands, bollinger_bands};
pub use rsi::{rsi, rsi_series, try_rsi};
pub use volatility::{try_volatility, volatility};
pub use volume::{average_volume, try_average_volume};

pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_ATR_PERIOD: usize = 14;
pub const DEFAULT_VOLUME_PERIOD: usize = 20;
pub const DEFAULT_VOLATILITY_PERIOD: usize = 20;

/// Neutral RSI used when the value cannot be computed.
pub const NEUTRAL_RSI: f64 = 50.0;
/// Volatility (in percent) assumed when it cannot be computed.
pub const DEFAULT_VOLATILITY_PCT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("insufficient data: have {bars} bars, need {required}")]
    InsufficientData { bars: usize, required: usize },

    #[error("degenerate computation: {reason}")]
    Degenerate { reason: String },
}

impl IndicatorError {
    pub(crate) fn insufficient(bars: usize, required: usize) -> Self {
        IndicatorError::InsufficientData { bars, required }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        IndicatorError::Degenerate {
            reason: reason.into(),
        }
    }
}

/// Reject a zero period and series shorter than `required`.
pub(crate) fn require_bars(len: usize, period: usize, required: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::degenerate("period must be positive"));
    }
    if len < required {
        return Err(IndicatorError::insufficient(len, required));
    }
    Ok(())
}

/// Reject NaN and infinite results.
pub(crate) fn finite(value: f64, what: &str) -> Result<f64, IndicatorError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(IndicatorError::degenerate(format!("{what} is not finite")))
    }
}

//! Pattern detectors built on the indicator library.
//!
//! Detectors never fail: too little data or a degenerate window simply
//! means "no signal".

pub mod breakout;
pub mod mean_reversion;

pub use breakout::{BreakoutParams, detect_breakdown, detect_breakout};
pub use mean_reversion::{
    MeanReversionParams, Opportunity, detect_mean_reversion, detect_overbought,
    reversal_probability,
};

//! Port traits for the collaborators the core consumes.

pub mod config_port;
pub mod data_port;
pub mod ledger_port;
pub mod order_port;
pub mod price_port;
pub mod sentiment_port;

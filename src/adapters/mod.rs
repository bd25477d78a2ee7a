//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_ledger;
pub mod csv_sentiment;
pub mod file_config_adapter;
pub mod paper_broker;

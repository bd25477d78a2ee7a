//! Core domain types and logic.

pub mod bar;
pub mod indicator;
pub mod levels;
pub mod pattern;
pub mod quality;
pub mod position;
pub mod ledger;
pub mod risk;
pub mod scanner;
pub mod engine;
pub mod watchlist;
pub mod config_validation;
pub mod error;

#[cfg(test)]
pub(crate) mod test_support;

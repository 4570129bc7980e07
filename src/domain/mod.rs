//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod params;
pub mod rule;
pub mod rule_eval;
pub mod rule_rows;
pub mod strategy;
pub mod signal;
pub mod scan;
pub mod config_validation;
pub mod error;

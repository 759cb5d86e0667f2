//! Core domain types and logic.

pub mod comparison;
pub mod config_validation;
pub mod error;
pub mod metrics;
pub mod normalizer;
pub mod ohlcv;
pub mod report_parser;
pub mod strategy;

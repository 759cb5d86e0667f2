//! Concrete adapter implementations for ports.

pub mod console_report;
pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod file_config_adapter;
pub mod json_report_adapter;
pub mod json_store;
pub mod process_backtest_adapter;
pub mod yahoo_adapter;

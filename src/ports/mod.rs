//! Port traits: the seams between domain logic and the outside world.

pub mod backtest_port;
pub mod config_port;
pub mod market_data_port;
pub mod report_port;

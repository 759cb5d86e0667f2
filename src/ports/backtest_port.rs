//! Backtest execution port trait.

use crate::domain::strategy::StrategySelector;

/// Runs an external backtest for one symbol and returns its raw report.
///
/// Implementations never fail: a run that cannot be started yields text
/// describing the problem, which simply parses to no metrics.
pub trait BacktestPort {
    fn run(&self, symbol: &str, period: &str, strategy: &StrategySelector) -> String;
}

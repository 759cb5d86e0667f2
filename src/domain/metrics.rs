//! Metric vocabulary extracted from backtest reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fixed set of metrics the report parser recognizes.
///
/// Declaration order is the label scan order: when one line carries more
/// than one label, the earlier key claims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    Return,
    Sharpe,
    Drawdown,
    Trades,
    WinRate,
    FinalCapital,
}

impl MetricKey {
    pub const ALL: [MetricKey; 6] = [
        MetricKey::Return,
        MetricKey::Sharpe,
        MetricKey::Drawdown,
        MetricKey::Trades,
        MetricKey::WinRate,
        MetricKey::FinalCapital,
    ];

    /// Label text as printed by the backtest program.
    pub fn label(&self) -> &'static str {
        match self {
            MetricKey::Return => "Total Return:",
            MetricKey::Sharpe => "Sharpe Ratio:",
            MetricKey::Drawdown => "Maximum Drawdown:",
            MetricKey::Trades => "Total Trades:",
            MetricKey::WinRate => "Win Rate:",
            MetricKey::FinalCapital => "Final Capital:",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Return => "return",
            MetricKey::Sharpe => "sharpe",
            MetricKey::Drawdown => "drawdown",
            MetricKey::Trades => "trades",
            MetricKey::WinRate => "win_rate",
            MetricKey::FinalCapital => "final_capital",
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw textual metric values for one symbol's backtest run.
///
/// A missing key means "not available", never zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BacktestMetrics {
    values: BTreeMap<MetricKey, String>,
}

impl BacktestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: MetricKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn contains(&self, key: MetricKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn insert(&mut self, key: MetricKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// The `return` metric as a number, if present and parseable.
    pub fn return_pct(&self) -> Option<f64> {
        self.get(MetricKey::Return).and_then(parse_return_pct)
    }
}

impl FromIterator<(MetricKey, String)> for BacktestMetrics {
    fn from_iter<I: IntoIterator<Item = (MetricKey, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Parse a percentage such as `"12.5%"` or `"-3.2"`.
///
/// Trailing `%` characters are stripped. Text that does not parse, and NaN,
/// yields `None`.
pub fn parse_return_pct(value: &str) -> Option<f64> {
    value
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
}

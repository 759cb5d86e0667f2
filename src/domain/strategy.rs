//! Strategy selector passed to the backtest program's menu prompt.

use crate::domain::error::TickerCompareError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_STRATEGY: &str = "1";

/// Menu code typed into the backtest program's strategy prompt.
///
/// Always a single non-empty line, since it is fed to the child as one
/// line of standard input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StrategySelector(String);

impl StrategySelector {
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Human-readable name for the report header.
    pub fn display_name(&self) -> String {
        match self.0.as_str() {
            "1" => "SMA Crossover".to_string(),
            "2" => "RSI Reversal".to_string(),
            "3" => "MACD Trend Following".to_string(),
            "4" => "Combined Strategy".to_string(),
            "5" => "Best Performer".to_string(),
            other => format!("Strategy {other}"),
        }
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self(DEFAULT_STRATEGY.to_string())
    }
}

impl FromStr for StrategySelector {
    type Err = TickerCompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TickerCompareError::InvalidStrategy {
                reason: "selector must not be empty".into(),
            });
        }
        if trimmed.contains(['\n', '\r']) {
            return Err(TickerCompareError::InvalidStrategy {
                reason: "selector must be a single line".into(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for StrategySelector {
    type Error = TickerCompareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StrategySelector> for String {
    fn from(value: StrategySelector) -> Self {
        value.0
    }
}

impl fmt::Display for StrategySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

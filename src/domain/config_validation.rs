//! Configuration validation.
//!
//! Validates config fields before any provider or process is touched.

use crate::domain::error::TickerCompareError;
use crate::domain::ohlcv::Interval;
use crate::domain::strategy::StrategySelector;
use crate::ports::config_port::ConfigPort;
use std::time::Duration;

pub const PROVIDERS: [&str; 2] = ["yahoo", "csv"];

/// Convert a configured number of seconds into a `Duration`.
///
/// Negative, non-finite, and unrepresentably large values are
/// `ConfigInvalid` for `[section] key`.
pub fn timeout_from_secs(
    section: &str,
    key: &str,
    secs: f64,
) -> Result<Duration, TickerCompareError> {
    Duration::try_from_secs_f64(secs).map_err(|e| TickerCompareError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{secs} is not a usable number of seconds: {e}"),
    })
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TickerCompareError> {
    validate_backtest_section(config)?;
    validate_fetch_section(config)?;
    validate_yahoo_section(config)?;
    Ok(())
}

fn validate_backtest_section(config: &dyn ConfigPort) -> Result<(), TickerCompareError> {
    let timeout = config.get_double("backtest", "timeout_secs", 0.0);
    if timeout < 0.0 || !timeout.is_finite() {
        return Err(TickerCompareError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "timeout_secs".to_string(),
            reason: "timeout_secs must be non-negative".to_string(),
        });
    }
    timeout_from_secs("backtest", "timeout_secs", timeout)?;

    if let Some(strategy) = config.get_string("backtest", "strategy") {
        strategy
            .parse::<StrategySelector>()
            .map_err(|e| TickerCompareError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "strategy".to_string(),
                reason: e.to_string(),
            })?;
    }

    if let Some(exe) = config.get_string("backtest", "executable") {
        if exe.trim().is_empty() {
            return Err(TickerCompareError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "executable".to_string(),
                reason: "executable must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_fetch_section(config: &dyn ConfigPort) -> Result<(), TickerCompareError> {
    let provider = config
        .get_string("fetch", "provider")
        .unwrap_or_else(|| "yahoo".to_string())
        .to_lowercase();
    if !PROVIDERS.contains(&provider.as_str()) {
        return Err(TickerCompareError::ConfigInvalid {
            section: "fetch".to_string(),
            key: "provider".to_string(),
            reason: format!("unknown provider '{provider}' (expected yahoo or csv)"),
        });
    }

    if provider == "csv" && config.get_string("fetch", "csv_dir").is_none() {
        return Err(TickerCompareError::ConfigMissing {
            section: "fetch".to_string(),
            key: "csv_dir".to_string(),
        });
    }

    if let Some(interval) = config.get_string("fetch", "interval") {
        interval
            .parse::<Interval>()
            .map_err(|e| TickerCompareError::ConfigInvalid {
                section: "fetch".to_string(),
                key: "interval".to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

fn validate_yahoo_section(config: &dyn ConfigPort) -> Result<(), TickerCompareError> {
    let timeout = config.get_double("yahoo", "timeout_secs", 30.0);
    if timeout <= 0.0 || !timeout.is_finite() {
        return Err(TickerCompareError::ConfigInvalid {
            section: "yahoo".to_string(),
            key: "timeout_secs".to_string(),
            reason: "timeout_secs must be positive".to_string(),
        });
    }
    timeout_from_secs("yahoo", "timeout_secs", timeout)?;

    let retries = config.get_int("yahoo", "max_retries", 3);
    if retries < 0 {
        return Err(TickerCompareError::ConfigInvalid {
            section: "yahoo".to_string(),
            key: "max_retries".to_string(),
            reason: "max_retries must be non-negative".to_string(),
        });
    }
    Ok(())
}

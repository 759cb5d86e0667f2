#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use tickercompare::domain::error::TickerCompareError;
use tickercompare::domain::ohlcv::{Interval, Period, PriceRow, PriceTable};
use tickercompare::domain::strategy::StrategySelector;
use tickercompare::ports::backtest_port::BacktestPort;
use tickercompare::ports::market_data_port::MarketDataPort;

pub struct MockMarketDataPort {
    pub tables: HashMap<String, PriceTable>,
    pub errors: HashMap<String, String>,
}

impl MockMarketDataPort {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_table(mut self, symbol: &str, table: PriceTable) -> Self {
        self.tables.insert(symbol.to_string(), table);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketDataPort {
    fn fetch_table(
        &self,
        symbol: &str,
        _period: Period,
        _interval: Interval,
    ) -> Result<PriceTable, TickerCompareError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TickerCompareError::Retrieval {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.tables.get(symbol).cloned().unwrap_or_default())
    }
}

/// Replays canned program output per symbol and records every call.
///
/// Unknown symbols get the same synthetic line a failed launch produces.
pub struct ScriptedBacktestPort {
    pub outputs: HashMap<String, String>,
    pub calls: RefCell<Vec<(String, String, String)>>,
}

impl ScriptedBacktestPort {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_output(mut self, symbol: &str, output: &str) -> Self {
        self.outputs.insert(symbol.to_string(), output.to_string());
        self
    }

    pub fn called_symbols(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(s, _, _)| s.clone()).collect()
    }
}

impl BacktestPort for ScriptedBacktestPort {
    fn run(&self, symbol: &str, period: &str, strategy: &StrategySelector) -> String {
        self.calls.borrow_mut().push((
            symbol.to_string(),
            period.to_string(),
            strategy.code().to_string(),
        ));
        self.outputs.get(symbol).cloned().unwrap_or_else(|| {
            format!("Error running backtest for {symbol}: No such file or directory (os error 2)")
        })
    }
}

pub fn make_row(date: &str, close: f64) -> PriceRow {
    PriceRow {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: Some(close - 1.0),
        high: Some(close + 2.0),
        low: Some(close - 2.0),
        close: Some(close),
        volume: Some(1_000_000.0),
    }
}

pub fn make_table(rows: &[(&str, f64)]) -> PriceTable {
    PriceTable::new(rows.iter().map(|(d, c)| make_row(d, *c)).collect())
}

/// A report in the layout the backtest program prints.
pub fn sample_report(total_return: &str, sharpe: &str) -> String {
    format!(
        "=== Backtest Results ===\n\
         Initial Capital: $100000.00\n\
         Final Capital: $112500.00\n\
         Total Return: {total_return}\n\
         Sharpe Ratio: {sharpe}\n\
         Maximum Drawdown: 8.20%\n\
         Total Trades: 14\n\
         Win Rate: 57.14%\n"
    )
}

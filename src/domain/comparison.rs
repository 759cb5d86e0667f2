//! Multi-symbol comparison: run one backtest per symbol, parse each report,
//! and pick the best performer by total return.
//!
//! Symbols run sequentially in caller order. A symbol whose run produced
//! nothing useful ends up with an empty metrics mapping and takes no part in
//! ranking; it never stops the batch.

use crate::domain::metrics::BacktestMetrics;
use crate::domain::report_parser::parse_report;
use crate::domain::strategy::StrategySelector;
use crate::ports::backtest_port::BacktestPort;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestPerformer {
    pub symbol: String,
    pub return_pct: f64,
}

/// Outcome of one comparison run.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub requested_symbols: Vec<String>,
    pub metrics_by_symbol: BTreeMap<String, BacktestMetrics>,
    pub best: Option<BestPerformer>,
    pub period: String,
    pub strategy: StrategySelector,
    pub completed_at: NaiveDateTime,
}

impl ComparisonResult {
    /// Requested symbols with repeats removed, first occurrence kept.
    pub fn symbols(&self) -> Vec<&str> {
        distinct(&self.requested_symbols)
    }

    pub fn metrics_for(&self, symbol: &str) -> Option<&BacktestMetrics> {
        self.metrics_by_symbol.get(symbol)
    }

    pub fn best_symbol(&self) -> Option<&str> {
        self.best.as_ref().map(|b| b.symbol.as_str())
    }

    pub fn best_return_value(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.return_pct)
    }

    /// Every symbol with a parseable return, highest first. Equal returns
    /// keep caller order, so the head always matches [`Self::best_symbol`].
    pub fn ranking(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .symbols()
            .into_iter()
            .filter_map(|s| {
                self.metrics_by_symbol
                    .get(s)
                    .and_then(BacktestMetrics::return_pct)
                    .map(|r| (s, r))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Run the backtest for each symbol and assemble the comparison.
pub fn compare_symbols(
    port: &dyn BacktestPort,
    symbols: &[String],
    period: &str,
    strategy: &StrategySelector,
) -> ComparisonResult {
    let mut metrics_by_symbol = BTreeMap::new();

    for symbol in distinct(symbols) {
        info!("Running backtest for {symbol}...");
        let output = port.run(symbol, period, strategy);
        if output.trim().is_empty() {
            warn!("No output received for {symbol}");
        }

        let metrics = parse_report(&output);
        debug!(symbol, metrics = metrics.len(), "parsed backtest report");
        metrics_by_symbol.insert(symbol.to_string(), metrics);
    }

    let best = find_best(symbols, &metrics_by_symbol);

    ComparisonResult {
        requested_symbols: symbols.to_vec(),
        metrics_by_symbol,
        best,
        period: period.to_string(),
        strategy: strategy.clone(),
        completed_at: chrono::Local::now().naive_local(),
    }
}

/// Highest parseable `return` in caller order. Ties keep the earlier symbol.
pub fn find_best(
    symbols: &[String],
    metrics_by_symbol: &BTreeMap<String, BacktestMetrics>,
) -> Option<BestPerformer> {
    let mut best: Option<BestPerformer> = None;

    for symbol in distinct(symbols) {
        let Some(value) = metrics_by_symbol
            .get(symbol)
            .and_then(BacktestMetrics::return_pct)
        else {
            continue;
        };

        if best.as_ref().is_none_or(|b| value > b.return_pct) {
            best = Some(BestPerformer {
                symbol: symbol.to_string(),
                return_pct: value,
            });
        }
    }

    best
}

fn distinct(symbols: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    symbols
        .iter()
        .map(String::as_str)
        .filter(|s| seen.insert(*s))
        .collect()
}

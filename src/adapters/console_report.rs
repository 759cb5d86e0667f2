//! Plain-text comparison table for the terminal.

use crate::domain::comparison::ComparisonResult;
use crate::domain::metrics::{BacktestMetrics, MetricKey};
use std::fmt::Write;

const RULE_WIDTH: usize = 80;
const NOT_AVAILABLE: &str = "N/A";

pub fn render_comparison(result: &ComparisonResult) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "STOCK COMPARISON REPORT");
    let _ = writeln!(
        out,
        "Period: {} | Strategy: {}",
        result.period,
        result.strategy.display_name()
    );
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out);
    let _ = writeln!(out, "PERFORMANCE COMPARISON");
    let _ = writeln!(out, "{light}");
    let _ = writeln!(
        out,
        "{:<8} {:<10} {:<8} {:<10} {:<8} {:<10} {}",
        "Stock", "Return", "Sharpe", "Drawdown", "Trades", "Win Rate", "Final Capital"
    );
    let _ = writeln!(out, "{light}");

    let empty = BacktestMetrics::new();
    for symbol in result.symbols() {
        let m = result.metrics_for(symbol).unwrap_or(&empty);
        let cell = move |key: MetricKey| m.get(key).unwrap_or(NOT_AVAILABLE);
        let _ = writeln!(
            out,
            "{:<8} {:<10} {:<8} {:<10} {:<8} {:<10} {}",
            symbol,
            cell(MetricKey::Return),
            cell(MetricKey::Sharpe),
            cell(MetricKey::Drawdown),
            cell(MetricKey::Trades),
            cell(MetricKey::WinRate),
            cell(MetricKey::FinalCapital),
        );
    }

    let _ = writeln!(out, "{light}");
    if let Some(best) = &result.best {
        let _ = writeln!(out, "BEST PERFORMER: {} ({:+.2}%)", best.symbol, best.return_pct);
    }
    let _ = writeln!(
        out,
        "Analysis completed at {}",
        result.completed_at.format("%Y-%m-%d %H:%M:%S")
    );
    out
}

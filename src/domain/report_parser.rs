//! Label-based parser for the free-text backtest report.
//!
//! Each line is checked against the labels in [`MetricKey::ALL`] order and
//! is claimed by the first label it contains. The value is whatever follows
//! that label, trimmed. The first line claimed by a label wins; later lines
//! for an already-captured label are ignored. Unrecognized lines are
//! skipped, so the parser never fails.

use crate::domain::metrics::{BacktestMetrics, MetricKey};

/// Extract the known metrics from raw report text.
pub fn parse_report(text: &str) -> BacktestMetrics {
    let mut metrics = BacktestMetrics::new();

    for line in text.lines() {
        let Some((key, value)) = match_line(line) else {
            continue;
        };
        if !metrics.contains(key) {
            metrics.insert(key, value);
        }
    }

    metrics
}

fn match_line(line: &str) -> Option<(MetricKey, &str)> {
    MetricKey::ALL.into_iter().find_map(|key| {
        line.split_once(key.label())
            .map(|(_, rest)| (key, rest.trim()))
    })
}

//! Bar normalization: provider table → typed bars → fetch envelope.
//!
//! [`fetch_envelope`] is a hard boundary: whatever the provider does, the
//! caller gets an envelope back, either success or failure.

use crate::domain::error::TickerCompareError;
use crate::domain::ohlcv::{FetchEnvelope, Interval, Period, PriceBar, PriceRow, PriceTable};
use crate::ports::market_data_port::MarketDataPort;
use tracing::{debug, warn};

/// Retrieve and normalize one symbol.
///
/// With `quiet` set, diagnostics emitted while the provider runs are
/// discarded; the previous subscriber is back in place as soon as the call
/// returns, whichever way it returns.
pub fn fetch_envelope(
    port: &dyn MarketDataPort,
    symbol: &str,
    period: Period,
    interval: Interval,
    quiet: bool,
) -> FetchEnvelope {
    let fetched = if quiet {
        with_quiet_diagnostics(|| port.fetch_table(symbol, period, interval))
    } else {
        port.fetch_table(symbol, period, interval)
    };

    match fetched {
        Ok(table) => {
            debug!(symbol, rows = table.len(), "provider returned table");
            normalize(symbol, period, interval, &table)
        }
        Err(e) => {
            warn!(symbol, error = %e, "retrieval failed");
            FetchEnvelope::failure(e.to_string())
        }
    }
}

/// Build an envelope from a provider table.
pub fn normalize(symbol: &str, period: Period, interval: Interval, table: &PriceTable) -> FetchEnvelope {
    match normalize_bars(symbol, table) {
        Ok(bars) => FetchEnvelope::Success {
            symbol: symbol.to_string(),
            period,
            interval,
            bars,
        },
        Err(e) => FetchEnvelope::failure(e.to_string()),
    }
}

/// Coerce every row into a [`PriceBar`], ascending by date.
///
/// One bad row fails the whole table.
pub fn normalize_bars(symbol: &str, table: &PriceTable) -> Result<Vec<PriceBar>, TickerCompareError> {
    if table.is_empty() {
        return Err(TickerCompareError::NoData {
            symbol: symbol.to_string(),
        });
    }

    let mut bars = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| coerce_row(i, row))
        .collect::<Result<Vec<_>, _>>()?;

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn coerce_row(index: usize, row: &PriceRow) -> Result<PriceBar, TickerCompareError> {
    Ok(PriceBar {
        date: row.date,
        open: coerce_price(index, row, "open", row.open)?,
        high: coerce_price(index, row, "high", row.high)?,
        low: coerce_price(index, row, "low", row.low)?,
        close: coerce_price(index, row, "close", row.close)?,
        volume: coerce_volume(index, row)?,
    })
}

fn coerce_price(
    index: usize,
    row: &PriceRow,
    field: &str,
    value: Option<f64>,
) -> Result<f64, TickerCompareError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(TickerCompareError::Coercion {
            row: index,
            reason: format!("{field} on {} is not a finite number ({v})", row.date),
        }),
        None => Err(TickerCompareError::Coercion {
            row: index,
            reason: format!("{field} on {} is missing", row.date),
        }),
    }
}

fn coerce_volume(index: usize, row: &PriceRow) -> Result<u64, TickerCompareError> {
    match row.volume {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v.trunc() as u64),
        Some(v) => Err(TickerCompareError::Coercion {
            row: index,
            reason: format!("volume on {} is not a non-negative integer ({v})", row.date),
        }),
        None => Err(TickerCompareError::Coercion {
            row: index,
            reason: format!("volume on {} is missing", row.date),
        }),
    }
}

/// Run `f` with diagnostics switched off for its duration only.
pub fn with_quiet_diagnostics<T>(f: impl FnOnce() -> T) -> T {
    tracing::subscriber::with_default(tracing::subscriber::NoSubscriber::default(), f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn row(date: &str, close: f64) -> PriceRow {
        PriceRow {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: Some(close - 1.0),
            high: Some(close + 1.0),
            low: Some(close - 2.0),
            close: Some(close),
            volume: Some(1000.0),
        }
    }

    struct FailingPort;

    impl MarketDataPort for FailingPort {
        fn fetch_table(
            &self,
            _symbol: &str,
            _period: Period,
            _interval: Interval,
        ) -> Result<PriceTable, TickerCompareError> {
            Err(TickerCompareError::Retrieval {
                symbol: "AAPL".into(),
                reason: "network unreachable".into(),
            })
        }
    }

    #[test]
    fn empty_table_is_no_data_failure() {
        let env = normalize("XYZ", Period::OneMonth, Interval::OneDay, &PriceTable::default());
        assert_eq!(env.error(), Some("No data found for XYZ"));
    }

    #[test]
    fn bars_come_out_in_date_order() {
        let table = PriceTable::new(vec![
            row("2024-01-03", 12.0),
            row("2024-01-01", 10.0),
            row("2024-01-02", 11.0),
        ]);
        let bars = normalize_bars("AAPL", &table).unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn success_echoes_request() {
        let table = PriceTable::new(vec![row("2024-01-01", 10.0)]);
        let env = normalize("aapl", Period::OneYear, Interval::OneWeek, &table);
        match env {
            FetchEnvelope::Success {
                symbol,
                period,
                interval,
                bars,
            } => {
                assert_eq!(symbol, "aapl");
                assert_eq!(period, Period::OneYear);
                assert_eq!(interval, Interval::OneWeek);
                assert_eq!(bars.len(), 1);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn missing_price_fails_whole_table() {
        let mut bad = row("2024-01-02", 11.0);
        bad.high = None;
        let table = PriceTable::new(vec![row("2024-01-01", 10.0), bad]);
        let env = normalize("AAPL", Period::OneMonth, Interval::OneDay, &table);
        let err = env.error().unwrap();
        assert!(err.contains("high"), "unexpected error: {err}");
        assert!(err.contains("2024-01-02"), "unexpected error: {err}");
    }

    #[test]
    fn nan_price_fails() {
        let mut bad = row("2024-01-01", 10.0);
        bad.close = Some(f64::NAN);
        let err = normalize_bars("AAPL", &PriceTable::new(vec![bad])).unwrap_err();
        assert!(matches!(err, TickerCompareError::Coercion { row: 0, .. }));
    }

    #[test]
    fn negative_volume_fails() {
        let mut bad = row("2024-01-01", 10.0);
        bad.volume = Some(-5.0);
        assert!(normalize_bars("AAPL", &PriceTable::new(vec![bad])).is_err());
    }

    #[test]
    fn fractional_volume_truncates() {
        let mut r = row("2024-01-01", 10.0);
        r.volume = Some(1234.9);
        let bars = normalize_bars("AAPL", &PriceTable::new(vec![r])).unwrap();
        assert_eq!(bars[0].volume, 1234);
    }

    #[test]
    fn provider_error_becomes_failure_envelope() {
        let env = fetch_envelope(&FailingPort, "AAPL", Period::OneMonth, Interval::OneDay, true);
        assert_eq!(env.error(), Some("network unreachable"));
    }

    #[test]
    fn quiet_scope_returns_closure_value() {
        assert_eq!(with_quiet_diagnostics(|| 41 + 1), 42);
    }

    struct CountEvents(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for CountEvents {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn quiet_scope_drops_events_until_it_ends() {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(CountEvents(Arc::clone(&count)));

        tracing::subscriber::with_default(subscriber, || {
            with_quiet_diagnostics(|| tracing::warn!("inside quiet scope"));
            assert_eq!(count.load(Ordering::SeqCst), 0);
            tracing::warn!("after quiet scope");
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

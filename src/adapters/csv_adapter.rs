//! CSV file market data adapter.
//!
//! Reads `<base_path>/<SYMBOL>.csv` with header
//! `date,open,high,low,close,volume` and serves the trailing period window.

use crate::domain::error::TickerCompareError;
use crate::domain::ohlcv::{Interval, Period, PriceRow, PriceTable};
use crate::ports::market_data_port::MarketDataPort;
use chrono::{Months, NaiveDate};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn read_rows(&self, symbol: &str) -> Result<Vec<PriceRow>, TickerCompareError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| TickerCompareError::Retrieval {
            symbol: symbol.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut rows = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TickerCompareError::Retrieval {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| TickerCompareError::Retrieval {
                symbol: symbol.to_string(),
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                TickerCompareError::Retrieval {
                    symbol: symbol.to_string(),
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            rows.push(PriceRow {
                date,
                open: cell(record.get(1)),
                high: cell(record.get(2)),
                low: cell(record.get(3)),
                close: cell(record.get(4)),
                volume: cell(record.get(5)),
            });
        }

        Ok(rows)
    }
}

/// Empty or non-numeric cells are gaps, left for the normalizer to reject.
fn cell(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

impl MarketDataPort for CsvAdapter {
    fn fetch_table(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceTable, TickerCompareError> {
        if interval != Interval::OneDay {
            return Err(TickerCompareError::Retrieval {
                symbol: symbol.to_string(),
                reason: format!("csv provider only serves daily bars, not {interval}"),
            });
        }

        let mut rows = self.read_rows(symbol)?;
        let Some(latest) = rows.iter().map(|r| r.date).max() else {
            return Ok(PriceTable::default());
        };

        if let Some(cutoff) = latest.checked_sub_months(Months::new(period.months())) {
            rows.retain(|r| r.date >= cutoff);
        }
        rows.sort_by_key(|r| r.date);
        Ok(PriceTable::new(rows))
    }
}

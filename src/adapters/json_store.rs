//! On-disk JSON layout for fetched data: `<data_dir>/<symbol>_<period>.json`.

use crate::domain::error::TickerCompareError;
use crate::domain::ohlcv::{FetchEnvelope, Period};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";

pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, symbol: &str, period: Period) -> PathBuf {
        self.data_dir.join(format!("{symbol}_{period}.json"))
    }

    /// Write a success envelope, creating the data directory if needed.
    ///
    /// Failure envelopes are not persisted and return `Ok(None)`.
    pub fn save(&self, envelope: &FetchEnvelope) -> Result<Option<PathBuf>, TickerCompareError> {
        let FetchEnvelope::Success { symbol, period, .. } = envelope else {
            return Ok(None);
        };

        let path = self.path_for(symbol, *period);
        fs::create_dir_all(&self.data_dir).map_err(|e| persist_error(&self.data_dir, e))?;

        let json = to_pretty_json(envelope)?;
        fs::write(&path, json).map_err(|e| persist_error(&path, e))?;
        Ok(Some(path))
    }

    pub fn load(&self, symbol: &str, period: Period) -> Result<FetchEnvelope, TickerCompareError> {
        let path = self.path_for(symbol, period);
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Pretty-print with two-space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, TickerCompareError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn persist_error(path: &Path, e: std::io::Error) -> TickerCompareError {
    TickerCompareError::Persist {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::{Interval, PriceBar};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn envelope() -> FetchEnvelope {
        FetchEnvelope::Success {
            symbol: "AAPL".into(),
            period: Period::OneYear,
            interval: Interval::OneDay,
            bars: vec![PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                open: 100.25,
                high: 110.5,
                low: 90.125,
                close: 105.0,
                volume: 50_000,
            }],
        }
    }

    #[test]
    fn save_creates_directory_and_named_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("nested").join("data"));
        let path = store.save(&envelope()).unwrap().unwrap();
        assert!(path.ends_with("AAPL_1y.json"));
        assert!(path.exists());
    }

    #[test]
    fn saved_file_uses_two_space_indent() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        let path = store.save(&envelope()).unwrap().unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("{\n  \"symbol\": \"AAPL\""), "got: {content}");
    }

    #[test]
    fn failure_envelope_is_not_written() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        let saved = store.save(&FetchEnvelope::failure("nope")).unwrap();
        assert!(saved.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn load_reads_back_saved_envelope() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        store.save(&envelope()).unwrap();
        assert_eq!(store.load("AAPL", Period::OneYear).unwrap(), envelope());
    }

    #[test]
    fn unwritable_location_is_persist_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = JsonStore::new(blocker.join("data"));
        let err = store.save(&envelope()).unwrap_err();
        assert!(matches!(err, TickerCompareError::Persist { .. }));
    }
}

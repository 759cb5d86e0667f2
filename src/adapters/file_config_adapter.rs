//! INI file configuration adapter.

use crate::domain::error::TickerCompareError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    /// Configuration with no values; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TickerCompareError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TickerCompareError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v.trim()))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[backtest]
executable = ./bin/test_backtest
strategy = 4
timeout_secs = 90

[fetch]
provider = csv
csv_dir = data/csv
quiet = no

[yahoo]
max_retries = 5
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "executable"),
            Some("./bin/test_backtest".to_string())
        );
        assert_eq!(adapter.get_string("fetch", "provider"), Some("csv".to_string()));
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank() {
        let adapter = FileConfigAdapter::from_string("[fetch]\ncsv_dir =\n").unwrap();
        assert_eq!(adapter.get_string("fetch", "csv_dir"), None);
        assert_eq!(adapter.get_string("fetch", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn numeric_lookups() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("yahoo", "max_retries", 3), 5);
        assert_eq!(adapter.get_double("backtest", "timeout_secs", 0.0), 90.0);
        assert_eq!(adapter.get_int("yahoo", "missing", 3), 3);
    }

    #[test]
    fn numeric_lookup_falls_back_on_garbage() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ntimeout_secs = soon\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "timeout_secs", 7.5), 7.5);
    }

    #[test]
    fn bool_lookups() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert!(!adapter.get_bool("fetch", "quiet", true));
        assert!(adapter.get_bool("fetch", "missing", true));

        let adapter =
            FileConfigAdapter::from_string("[fetch]\na = true\nb = yes\nc = on\n").unwrap();
        assert!(adapter.get_bool("fetch", "a", false));
        assert!(adapter.get_bool("fetch", "b", false));
        assert!(adapter.get_bool("fetch", "c", false));
    }

    #[test]
    fn empty_adapter_uses_defaults() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_string("backtest", "executable"), None);
        assert_eq!(adapter.get_int("yahoo", "max_retries", 3), 3);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("backtest", "strategy"), Some("4".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(TickerCompareError::ConfigParse { .. })));
    }
}

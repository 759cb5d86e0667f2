//! CSV export of a comparison, one row per symbol.

use crate::domain::comparison::ComparisonResult;
use crate::domain::error::TickerCompareError;
use crate::domain::metrics::MetricKey;
use crate::ports::report_port::ReportPort;
use std::path::Path;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &ComparisonResult, output_path: &Path) -> Result<(), TickerCompareError> {
        let persist = |e: csv::Error| TickerCompareError::Persist {
            path: output_path.display().to_string(),
            reason: e.to_string(),
        };

        let mut wtr = csv::Writer::from_path(output_path).map_err(persist)?;

        let mut header = vec!["symbol"];
        header.extend(MetricKey::ALL.iter().map(|k| k.as_str()));
        wtr.write_record(&header).map_err(persist)?;

        for symbol in result.symbols() {
            let metrics = result.metrics_for(symbol);
            let mut record = vec![symbol];
            record.extend(
                MetricKey::ALL
                    .iter()
                    .map(|k| metrics.and_then(|m| m.get(*k)).unwrap_or("")),
            );
            wtr.write_record(&record).map_err(persist)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

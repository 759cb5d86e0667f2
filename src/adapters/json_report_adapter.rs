//! JSON export of a comparison.

use crate::adapters::json_store::to_pretty_json;
use crate::domain::comparison::ComparisonResult;
use crate::domain::error::TickerCompareError;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &ComparisonResult, output_path: &Path) -> Result<(), TickerCompareError> {
        let json = to_pretty_json(result)?;
        fs::write(output_path, json).map_err(|e| TickerCompareError::Persist {
            path: output_path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

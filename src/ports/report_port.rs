//! Comparison export port trait.

use crate::domain::comparison::ComparisonResult;
use crate::domain::error::TickerCompareError;
use std::path::Path;

/// Port for writing a finished comparison to a file.
pub trait ReportPort {
    fn write(&self, result: &ComparisonResult, output_path: &Path) -> Result<(), TickerCompareError>;
}

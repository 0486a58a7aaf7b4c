//! Report generation port.

use crate::domain::error::SharpefolioError;
use crate::domain::pipeline::StudyOutcome;
use std::path::Path;

/// Port for writing study results.
pub trait ReportPort {
    fn write(&self, outcome: &StudyOutcome, output_dir: &Path) -> Result<(), SharpefolioError>;
}

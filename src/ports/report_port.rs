//! Report export port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SigtraderError;
use std::path::{Path, PathBuf};

/// Port for persisting the outputs of a finished run.
pub trait ReportPort {
    /// Write the report under `output_dir`, returning the paths written.
    fn write(
        &self,
        result: &BacktestResult,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, SigtraderError>;
}

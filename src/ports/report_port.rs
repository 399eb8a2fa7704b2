//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SwingError;
use std::io::Write;

/// Port for rendering a finished backtest.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, out: &mut dyn Write) -> Result<(), SwingError>;
}

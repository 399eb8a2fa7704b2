//! Domain error types.
//!
//! Only genuine failures live here. Skipped entries (zero size, not enough
//! cash, already in a position) are ordinary values, see
//! [`crate::domain::execution::SkipReason`].

use chrono::NaiveDate;

/// Top-level error type for swingtrader.
#[derive(Debug, thiserror::Error)]
pub enum SwingError {
    #[error("no price data provided for backtesting")]
    EmptyPriceSeries,

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid price data at row {row}: {reason}")]
    DataFormat { row: usize, reason: String },

    #[error("no price data between {start} and {end}")]
    NoData { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SwingError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SwingError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SwingError> for std::process::ExitCode {
    fn from(err: &SwingError) -> Self {
        let code: u8 = match err {
            SwingError::Io(_) => 1,
            SwingError::ConfigParse { .. }
            | SwingError::ConfigMissing { .. }
            | SwingError::ConfigInvalid { .. } => 2,
            SwingError::Csv(_) | SwingError::DataFormat { .. } | SwingError::NoData { .. } => 5,
            SwingError::EmptyPriceSeries => 6,
        };
        std::process::ExitCode::from(code)
    }
}

//! Configuration access port trait.
//!
//! `Ok(None)` means the key is absent; a value that is present but does not
//! parse is an error, never a silent fallback to the default.

use crate::domain::error::SwingError;
use chrono::NaiveDate;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, SwingError>;
    fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>, SwingError>;
    fn get_date(&self, section: &str, key: &str) -> Result<Option<NaiveDate>, SwingError>;
    /// Comma-separated numbers, e.g. `20, 25, 30`.
    fn get_double_list(&self, section: &str, key: &str) -> Result<Option<Vec<f64>>, SwingError>;
}

//! INI file configuration adapter.
//!
//! Recognised layout:
//!
//! ```ini
//! [backtest]
//! initial_capital = 10000
//! trade_fee = 0.001
//! slippage = 0.001
//! start_date = 2020-01-01
//! end_date = 2024-12-31
//!
//! [strategy]
//! buy_threshold = 30
//! sell_threshold = 70
//! stop_loss = 0.05
//! take_profit = 0.10
//! rsi_period = 14
//! bb_period = 20
//! bb_stddev = 2.0
//!
//! [risk]
//! max_drawdown = 0.20
//! position_size = 0.02
//!
//! [sweep]
//! buy_thresholds = 20, 25, 30, 35
//! sell_thresholds = 65, 70, 75, 80
//! stop_losses = 0.03, 0.05, 0.08
//! take_profits = 0.05, 0.10, 0.15
//! ```

use crate::domain::error::SwingError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SwingError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| SwingError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SwingError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| SwingError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key).filter(|v| !v.trim().is_empty())
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, SwingError> {
        self.config
            .getfloat(section, key)
            .map_err(|_| SwingError::invalid(section, key, "expected a number"))
    }

    fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>, SwingError> {
        let value = self
            .config
            .getuint(section, key)
            .map_err(|_| SwingError::invalid(section, key, "expected a non-negative integer"))?;
        value
            .map(|v| {
                usize::try_from(v).map_err(|_| SwingError::invalid(section, key, "value too large"))
            })
            .transpose()
    }

    fn get_date(&self, section: &str, key: &str) -> Result<Option<NaiveDate>, SwingError> {
        self.get_string(section, key)
            .map(|s| {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                    SwingError::invalid(section, key, "invalid date format (expected YYYY-MM-DD)")
                })
            })
            .transpose()
    }

    fn get_double_list(&self, section: &str, key: &str) -> Result<Option<Vec<f64>>, SwingError> {
        self.get_string(section, key)
            .map(|s| {
                s.split(',')
                    .map(|item| {
                        item.trim().parse::<f64>().map_err(|_| {
                            SwingError::invalid(
                                section,
                                key,
                                format!("expected a comma-separated list of numbers, got '{}'", item.trim()),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
    }
}

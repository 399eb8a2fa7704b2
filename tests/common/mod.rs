#![allow(dead_code)]

use chrono::NaiveDate;
use swingtrader::domain::backtest::BacktestConfig;
use swingtrader::domain::error::SwingError;
pub use swingtrader::domain::price::PricePoint;
use swingtrader::ports::data_port::DataPort;

/// In-memory price source. Applies the date filter the same way the CSV
/// adapter does, so pipeline tests do not need files.
pub struct MockDataPort {
    pub prices: Vec<PricePoint>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(prices: Vec<PricePoint>) -> Self {
        Self {
            prices,
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            prices: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn load_prices(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PricePoint>, SwingError> {
        if let Some(reason) = &self.error {
            return Err(SwingError::DataFormat {
                row: 0,
                reason: reason.clone(),
            });
        }
        Ok(swingtrader::domain::price::filter_by_date_range(
            self.prices.clone(),
            start_date,
            end_date,
        ))
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> PricePoint {
    PricePoint::flat(
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        close,
    )
}

/// One bar per calendar day starting 2024-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::flat(start_date() + chrono::Duration::days(i as i64), c))
        .collect()
}

/// Oscillating series that drives RSI through both thresholds several times
/// with the default periods.
pub fn generate_wave(n: usize) -> Vec<PricePoint> {
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 15.0 * (t * 0.2).sin() + 3.0 * (t * 1.3).sin()
        })
        .collect();
    bars_from_closes(&closes)
}

/// Ten flat bars, a one-day gap down to 85, then a steady recovery.
/// With [`fast_config`] this gives one BUY at the gap (2024-01-11) and SELLs
/// at 100 (2024-01-15) and 104 (2024-01-16).
pub fn gap_down_and_recovery() -> Vec<PricePoint> {
    let mut closes = vec![100.0; 10];
    closes.extend([85.0, 88.0, 92.0, 96.0, 100.0, 104.0]);
    bars_from_closes(&closes)
}

/// A grinding selloff that produces BUY signals on five consecutive bars.
pub fn grinding_selloff() -> Vec<PricePoint> {
    let mut closes = vec![100.0; 10];
    closes.extend([98.0, 95.0, 91.0, 86.0, 80.0]);
    closes.extend([84.0, 89.0, 94.0, 99.0, 104.0, 108.0]);
    bars_from_closes(&closes)
}

/// RSI(3), BB(5, 1.0): short enough for hand-sized series.
pub fn fast_config() -> BacktestConfig {
    let mut config = BacktestConfig::default();
    config.strategy.rsi_period = 3;
    config.strategy.bb_period = 5;
    config.strategy.bb_stddev_mult = 1.0;
    config
}

pub fn no_cost_config() -> BacktestConfig {
    BacktestConfig {
        trade_fee_pct: 0.0,
        slippage_pct: 0.0,
        ..fast_config()
    }
}

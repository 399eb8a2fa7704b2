//! Configuration validation.
//!
//! Runs on the fully merged config (file values plus command-line
//! overrides) before any backtest starts. The first violation wins.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SwingError;
use crate::domain::sweep::ParamGrid;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &BacktestConfig) -> Result<(), SwingError> {
    validate_initial_capital(config)?;
    validate_costs(config)?;
    validate_thresholds(config)?;
    validate_exit_levels(config)?;
    validate_risk(config)?;
    validate_periods(config)?;
    Ok(())
}

/// An inverted date filter would silently select nothing.
pub fn validate_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), SwingError> {
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(SwingError::invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

/// Every list non-empty, every value in the range the single-run checks
/// accept, and at least one buy threshold below some sell threshold.
pub fn validate_param_grid(grid: &ParamGrid) -> Result<(), SwingError> {
    let lists: [(&str, &[f64], fn(f64) -> bool, &str); 4] = [
        ("buy_thresholds", grid.buy_thresholds.as_slice(), is_rsi_level, "between 0 and 100"),
        ("sell_thresholds", grid.sell_thresholds.as_slice(), is_rsi_level, "between 0 and 100"),
        ("stop_losses", grid.stop_loss_pcts.as_slice(), is_unit_fraction, "in (0, 1]"),
        ("take_profits", grid.take_profit_pcts.as_slice(), is_unit_fraction, "in (0, 1]"),
    ];

    for (key, values, accepts, range) in lists {
        if values.is_empty() {
            return Err(SwingError::invalid("sweep", key, "list must not be empty"));
        }
        if let Some(bad) = values.iter().find(|v| !accepts(**v)) {
            return Err(SwingError::invalid(
                "sweep",
                key,
                format!("{bad} is out of range, values must be {range}"),
            ));
        }
    }

    let any_pair = grid
        .buy_thresholds
        .iter()
        .any(|buy| grid.sell_thresholds.iter().any(|sell| buy < sell));
    if !any_pair {
        return Err(SwingError::invalid(
            "sweep",
            "buy_thresholds",
            "no buy threshold is below any sell threshold",
        ));
    }
    Ok(())
}

fn is_rsi_level(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

fn is_unit_fraction(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

fn validate_initial_capital(config: &BacktestConfig) -> Result<(), SwingError> {
    if !(config.initial_capital > 0.0) {
        return Err(SwingError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_costs(config: &BacktestConfig) -> Result<(), SwingError> {
    if !(config.trade_fee_pct >= 0.0) {
        return Err(SwingError::invalid(
            "backtest",
            "trade_fee",
            "trade_fee must be non-negative",
        ));
    }
    if !(config.slippage_pct >= 0.0) {
        return Err(SwingError::invalid(
            "backtest",
            "slippage",
            "slippage must be non-negative",
        ));
    }
    Ok(())
}

fn validate_thresholds(config: &BacktestConfig) -> Result<(), SwingError> {
    let s = &config.strategy;
    for (key, value) in [
        ("buy_threshold", s.buy_threshold),
        ("sell_threshold", s.sell_threshold),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(SwingError::invalid(
                "strategy",
                key,
                format!("{key} must be between 0 and 100"),
            ));
        }
    }
    if s.buy_threshold >= s.sell_threshold {
        return Err(SwingError::invalid(
            "strategy",
            "buy_threshold",
            "buy_threshold must be below sell_threshold",
        ));
    }
    Ok(())
}

fn validate_exit_levels(config: &BacktestConfig) -> Result<(), SwingError> {
    let s = &config.strategy;
    for (key, value) in [
        ("stop_loss", s.stop_loss_pct),
        ("take_profit", s.take_profit_pct),
    ] {
        if !(value > 0.0 && value <= 1.0) {
            return Err(SwingError::invalid(
                "strategy",
                key,
                format!("{key} must be in (0, 1]"),
            ));
        }
    }
    Ok(())
}

fn validate_risk(config: &BacktestConfig) -> Result<(), SwingError> {
    let r = &config.risk;
    if !(r.position_size_pct > 0.0 && r.position_size_pct <= 1.0) {
        return Err(SwingError::invalid(
            "risk",
            "position_size",
            "position_size must be in (0, 1]",
        ));
    }
    if !(0.0..=1.0).contains(&r.max_drawdown_pct) {
        return Err(SwingError::invalid(
            "risk",
            "max_drawdown",
            "max_drawdown must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_periods(config: &BacktestConfig) -> Result<(), SwingError> {
    let s = &config.strategy;
    if s.rsi_period == 0 {
        return Err(SwingError::invalid(
            "strategy",
            "rsi_period",
            "rsi_period must be at least 1",
        ));
    }
    if s.bb_period == 0 {
        return Err(SwingError::invalid(
            "strategy",
            "bb_period",
            "bb_period must be at least 1",
        ));
    }
    if !(s.bb_stddev_mult > 0.0) {
        return Err(SwingError::invalid(
            "strategy",
            "bb_stddev",
            "bb_stddev must be positive",
        ));
    }
    Ok(())
}

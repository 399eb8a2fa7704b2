//! Grid search over strategy thresholds.
//!
//! Each grid point is an independent backtest with its own account, so
//! points can run on the rayon pool without any coordination.

use rayon::prelude::*;

use super::backtest::{BacktestConfig, BacktestResult, run_backtest};
use super::error::SwingError;
use super::price::PricePoint;

/// Values to try for each swept parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub buy_thresholds: Vec<f64>,
    pub sell_thresholds: Vec<f64>,
    pub stop_loss_pcts: Vec<f64>,
    pub take_profit_pcts: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        ParamGrid {
            buy_thresholds: vec![20.0, 25.0, 30.0, 35.0],
            sell_thresholds: vec![65.0, 70.0, 75.0, 80.0],
            stop_loss_pcts: vec![0.03, 0.05, 0.08],
            take_profit_pcts: vec![0.05, 0.10, 0.15],
        }
    }
}

impl ParamGrid {
    /// Upper bound on the number of configurations, before dropping
    /// combinations whose buy threshold is not below the sell threshold.
    pub fn size(&self) -> usize {
        self.buy_thresholds.len()
            * self.sell_thresholds.len()
            * self.stop_loss_pcts.len()
            * self.take_profit_pcts.len()
    }

    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::new();

        for &buy in &self.buy_thresholds {
            for &sell in &self.sell_thresholds {
                if buy >= sell {
                    continue;
                }
                for &stop in &self.stop_loss_pcts {
                    for &target in &self.take_profit_pcts {
                        let mut config = base.clone();
                        config.strategy.buy_threshold = buy;
                        config.strategy.sell_threshold = sell;
                        config.strategy.stop_loss_pct = stop;
                        config.strategy.take_profit_pct = target;
                        configs.push(config);
                    }
                }
            }
        }

        configs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub config: BacktestConfig,
    pub result: BacktestResult,
}

/// Backtest every grid point over `prices`, best total return first.
///
/// Ordering among equal returns follows grid order, so parallel and
/// sequential runs produce the same list.
pub fn run_sweep(
    prices: &[PricePoint],
    grid: &ParamGrid,
    base: &BacktestConfig,
    parallel: bool,
) -> Result<Vec<SweepEntry>, SwingError> {
    let configs = grid.generate_configs(base);
    tracing::info!(configs = configs.len(), parallel, "starting parameter sweep");

    let run = |config: &BacktestConfig| -> Result<SweepEntry, SwingError> {
        let result = run_backtest(prices, config)?;
        Ok(SweepEntry {
            config: config.clone(),
            result,
        })
    };

    let mut entries = if parallel {
        configs
            .par_iter()
            .map(run)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        configs.iter().map(run).collect::<Result<Vec<_>, _>>()?
    };

    entries.sort_by(|a, b| {
        b.result
            .metrics
            .total_return
            .total_cmp(&a.result.metrics.total_return)
    });

    Ok(entries)
}

//! Backtest engine and event loop.
//!
//! A run walks the bars in date order against a fresh [`Account`], applying
//! the signals dated on each bar. Per signal: a BUY may open the single
//! position, a SELL closes it, and then the stop and target of whatever is
//! still open are checked at the same signal price. Anything left open after
//! the last signal is closed at the final bar.

use chrono::NaiveDate;

use super::account::{Account, EquityPoint};
use super::error::SwingError;
use super::execution::{EntryResult, ExecutionConfig, check_triggers, enter_long, exit_position};
use super::metrics::Metrics;
use super::position::{ClosedTrade, ExitReason};
use super::price::PricePoint;
use super::strategy::{RiskConfig, Signal, SignalKind, StrategyConfig, generate_signals};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub trade_fee_pct: f64,
    pub slippage_pct: f64,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            trade_fee_pct: 0.001,
            slippage_pct: 0.001,
            strategy: StrategyConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl BacktestConfig {
    pub fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            trade_fee_pct: self.trade_fee_pct,
            slippage_pct: self.slippage_pct,
        }
    }
}

/// Everything a report needs, computed once at the end of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub trades: Vec<ClosedTrade>,
    pub signals: Vec<Signal>,
    /// Cash plus open position at each bar's close, one point per bar.
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

impl BacktestResult {
    /// `initial_capital` plus the sum of trade P&L.
    pub fn final_capital(&self) -> f64 {
        self.metrics.final_capital
    }

    pub fn total_fees(&self) -> f64 {
        self.metrics.total_fees
    }
}

/// Run the strategy over `prices` and aggregate the outcome.
///
/// Fails only on an empty series. A series too short for the indicators
/// simply produces no signals and no trades.
pub fn run_backtest(
    prices: &[PricePoint],
    config: &BacktestConfig,
) -> Result<BacktestResult, SwingError> {
    let (first, last) = match (prices.first(), prices.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(SwingError::EmptyPriceSeries),
    };

    let signals = generate_signals(prices, &config.strategy);
    let account = execute_signals(&signals, prices, config);

    let (trades, equity_curve) = account.into_history();
    let metrics = Metrics::compute(&trades, config.initial_capital, first.date, last.date);

    tracing::info!(
        bars = prices.len(),
        signals = signals.len(),
        trades = trades.len(),
        final_capital = metrics.final_capital,
        "backtest complete"
    );

    Ok(BacktestResult {
        start_date: first.date,
        end_date: last.date,
        initial_capital: config.initial_capital,
        trades,
        signals,
        equity_curve,
        metrics,
    })
}

/// Drive a fresh account through `signals`, marking equity at every bar's
/// close, then close any leftover position at the last bar of `prices`.
///
/// The last equity point is taken after that final close.
pub fn execute_signals(
    signals: &[Signal],
    prices: &[PricePoint],
    config: &BacktestConfig,
) -> Account {
    let execution = config.execution();
    let mut account = Account::new(config.initial_capital);
    let mut pending = signals.iter().peekable();

    for (i, bar) in prices.iter().enumerate() {
        while let Some(signal) = pending.next_if(|s| s.date <= bar.date) {
            apply_signal(&mut account, signal, config, &execution);
        }

        if i + 1 == prices.len() {
            for signal in pending.by_ref() {
                apply_signal(&mut account, signal, config, &execution);
            }
            if let Some(exit) =
                exit_position(&mut account, bar.close, bar.date, ExitReason::EndOfData, &execution)
            {
                tracing::debug!(date = %bar.date, pnl = exit.pnl, "closed open position at end of data");
            }
        }

        account.record_equity(bar.date, bar.close);
    }

    account
}

/// One signal: BUY may open, SELL closes, then stop and target are checked
/// at the signal price.
fn apply_signal(
    account: &mut Account,
    signal: &Signal,
    config: &BacktestConfig,
    execution: &ExecutionConfig,
) {
    match signal.kind {
        SignalKind::Buy => {
            let entry = enter_long(
                account,
                signal.price,
                signal.date,
                &config.strategy,
                &config.risk,
                execution,
            );
            match entry {
                EntryResult::Entered {
                    quantity,
                    execution_price,
                    ..
                } => {
                    tracing::debug!(date = %signal.date, quantity, price = execution_price, "entered long");
                }
                EntryResult::Skipped(reason) => {
                    tracing::debug!(date = %signal.date, ?reason, "buy signal skipped");
                }
            }
        }
        SignalKind::Sell => {
            if let Some(exit) =
                exit_position(account, signal.price, signal.date, ExitReason::Signal, execution)
            {
                tracing::debug!(date = %signal.date, pnl = exit.pnl, "closed on sell signal");
            }
        }
        SignalKind::Hold => {}
    }

    if let Some(exit) = check_triggers(account, signal.price, signal.date, execution) {
        tracing::debug!(date = %signal.date, reason = %exit.reason, pnl = exit.pnl, "exit triggered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bars(closes: &[f64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::flat(d(i as u32 + 1), c))
            .collect()
    }

    fn signal(day: u32, kind: SignalKind, price: f64) -> Signal {
        Signal {
            date: d(day),
            kind,
            price,
            reason: "",
        }
    }

    fn no_costs() -> BacktestConfig {
        BacktestConfig {
            trade_fee_pct: 0.0,
            slippage_pct: 0.0,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn default_config_values() {
        let c = BacktestConfig::default();
        assert_relative_eq!(c.initial_capital, 10_000.0);
        assert_eq!(
            c.execution(),
            ExecutionConfig {
                trade_fee_pct: 0.001,
                slippage_pct: 0.001
            }
        );
        assert_eq!(c.strategy, StrategyConfig::default());
    }

    #[test]
    fn empty_series_is_an_error() {
        let err = run_backtest(&[], &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, SwingError::EmptyPriceSeries));
    }

    #[test]
    fn short_series_runs_without_trades() {
        let prices = bars(&[100.0, 101.0, 102.0]);
        let result = run_backtest(&prices, &BacktestConfig::default()).unwrap();

        assert!(result.trades.is_empty());
        assert!(result.signals.is_empty());
        assert_eq!(result.start_date, d(1));
        assert_eq!(result.end_date, d(3));
        assert_relative_eq!(result.final_capital(), 10_000.0);
    }

    #[test]
    fn buy_then_sell_round_trip() {
        let prices = bars(&[100.0, 100.0, 104.0, 104.0]);
        let signals = vec![
            signal(1, SignalKind::Buy, 100.0),
            signal(3, SignalKind::Sell, 104.0),
        ];
        let account = execute_signals(&signals, &prices, &no_costs());

        let trades = account.closed_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::Signal);
        assert_eq!(trades[0].exit_date, d(3));
        // 40 shares, +4 each
        assert_relative_eq!(trades[0].pnl, 160.0, epsilon = 1e-9);
        assert_relative_eq!(account.cash, 10_160.0, epsilon = 1e-9);
    }

    #[test]
    fn buy_while_open_is_ignored() {
        let prices = bars(&[100.0, 99.0, 101.0]);
        let signals = vec![
            signal(1, SignalKind::Buy, 100.0),
            signal(2, SignalKind::Buy, 99.0),
        ];
        let account = execute_signals(&signals, &prices, &no_costs());

        let trades = account.closed_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].id, "T1");
        assert_eq!(trades[0].entry_date, d(1));
        assert_relative_eq!(trades[0].entry_price, 100.0);
        // 2% of 10000 risked against a 5% stop: 40 shares
        assert_eq!(trades[0].quantity, 40);
        assert_eq!(trades[0].exit_reason, ExitReason::EndOfData);

        // day 2 still holds only the first 40 shares: 6000 cash + 40 * 99
        let curve = account.equity_curve();
        assert_relative_eq!(curve[1].equity, 9_960.0, epsilon = 1e-9);
    }

    #[test]
    fn equity_curve_has_one_point_per_bar() {
        let prices = bars(&[100.0, 102.0, 98.0, 104.0]);
        let signals = vec![
            signal(1, SignalKind::Buy, 100.0),
            signal(4, SignalKind::Sell, 104.0),
        ];
        let account = execute_signals(&signals, &prices, &no_costs());

        let equity: Vec<f64> = account.equity_curve().iter().map(|p| p.equity).collect();
        let dates: Vec<NaiveDate> = account.equity_curve().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3), d(4)]);
        // 40 shares held from day 1 through the sell on day 4
        assert_relative_eq!(equity[0], 10_000.0, epsilon = 1e-9);
        assert_relative_eq!(equity[1], 10_080.0, epsilon = 1e-9);
        assert_relative_eq!(equity[2], 9_920.0, epsilon = 1e-9);
        assert_relative_eq!(equity[3], 10_160.0, epsilon = 1e-9);
        assert!(account.is_flat());
    }

    #[test]
    fn last_equity_point_follows_end_of_data_close() {
        let prices = bars(&[100.0, 101.0, 102.0]);
        let signals = vec![signal(1, SignalKind::Buy, 100.0)];
        let config = BacktestConfig::default();
        let account = execute_signals(&signals, &prices, &config);

        let last = account.equity_curve().last().copied().unwrap();
        assert_eq!(last.date, d(3));
        assert_relative_eq!(last.equity, account.cash, epsilon = 1e-9);
    }

    #[test]
    fn sell_while_flat_is_ignored() {
        let prices = bars(&[100.0, 101.0]);
        let signals = vec![signal(2, SignalKind::Sell, 101.0)];
        let account = execute_signals(&signals, &prices, &BacktestConfig::default());

        assert!(account.closed_trades().is_empty());
        assert_relative_eq!(account.cash, 10_000.0);
    }

    #[test]
    fn stop_loss_checked_at_next_signal_price() {
        let prices = bars(&[100.0, 94.0, 94.0]);
        let signals = vec![
            signal(1, SignalKind::Buy, 100.0),
            signal(2, SignalKind::Buy, 94.0),
        ];
        let account = execute_signals(&signals, &prices, &no_costs());

        let trades = account.closed_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(trades[0].exit_date, d(2));
        assert_relative_eq!(trades[0].exit_price, 94.0);
    }

    #[test]
    fn take_profit_checked_at_next_signal_price() {
        let prices = bars(&[100.0, 111.0, 111.0]);
        let signals = vec![
            signal(1, SignalKind::Buy, 100.0),
            signal(2, SignalKind::Buy, 111.0),
        ];
        let account = execute_signals(&signals, &prices, &no_costs());

        let trades = account.closed_trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_reason, ExitReason::TakeProfit);
    }

    #[test]
    fn open_position_closed_at_end_of_data() {
        let prices = bars(&[100.0, 101.0, 102.0, 103.0]);
        let signals = vec![signal(1, SignalKind::Buy, 100.0)];
        let config = BacktestConfig::default();
        let account = execute_signals(&signals, &prices, &config);

        assert!(account.is_flat());
        let trades = account.closed_trades();
        assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.exit_date, d(4));
        assert_relative_eq!(trade.exit_price, 103.0 * (1.0 - config.slippage_pct), epsilon = 1e-9);
    }

    #[test]
    fn final_capital_matches_sum_of_pnl() {
        let prices = bars(&[100.0, 104.0, 98.0, 97.0, 99.0]);
        let signals = vec![
            signal(1, SignalKind::Buy, 100.0),
            signal(2, SignalKind::Sell, 104.0),
            signal(3, SignalKind::Buy, 98.0),
        ];
        let config = BacktestConfig::default();
        let account = execute_signals(&signals, &prices, &config);
        let (trades, _) = account.into_history();
        let metrics = Metrics::compute(&trades, config.initial_capital, d(1), d(5));

        let sum: f64 = trades.iter().map(|t| t.pnl).sum();
        assert_eq!(trades.len(), 2);
        assert_eq!(metrics.final_capital, config.initial_capital + sum);
    }
}

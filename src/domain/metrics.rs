//! Summary statistics over a completed trade list.
//!
//! Returns, win rate and drawdown are percentages (10.0 means 10%). Drawdown
//! is measured on the realized-capital curve obtained by replaying trades in
//! the order they closed, not on a daily mark-to-market curve.

use super::account::EquityPoint;
use super::position::ClosedTrade;
use super::price::PricePoint;
use chrono::NaiveDate;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_pnl: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Mean absolute loss, so always >= 0.
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub total_fees: f64,
    pub avg_trade_duration_days: f64,
}

impl Metrics {
    pub fn compute(
        trades: &[ClosedTrade],
        initial_capital: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_pnl = 0.0_f64;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_fees = 0.0_f64;
        let mut total_duration_days = 0i64;

        for trade in trades {
            let pnl = trade.pnl;
            total_pnl += pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                if pnl > largest_win {
                    largest_win = pnl;
                }
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                if pnl.abs() > largest_loss {
                    largest_loss = pnl.abs();
                }
            } else {
                trades_breakeven += 1;
            }

            total_fees += trade.entry_fee + trade.exit_fee;
            total_duration_days += trade.holding_days();
        }

        let total_trades = trades.len();
        let final_capital = initial_capital + total_pnl;

        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };

        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };

        let avg_trade_duration_days = if total_trades > 0 {
            total_duration_days as f64 / total_trades as f64
        } else {
            0.0
        };

        let total_return = if initial_capital != 0.0 {
            (final_capital - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };

        Metrics {
            total_pnl,
            final_capital,
            total_return,
            annualized_return: annualized_return(initial_capital, final_capital, start_date, end_date),
            max_drawdown: compute_drawdown(trades, initial_capital),
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            total_fees,
            avg_trade_duration_days,
        }
    }
}

/// Compound annual growth between the two capitals over `[start, end]`.
/// Zero when the span is empty or either capital is not positive.
fn annualized_return(initial: f64, final_capital: f64, start: NaiveDate, end: NaiveDate) -> f64 {
    let years = (end - start).num_days() as f64 / DAYS_PER_YEAR;
    if years > 0.0 && initial > 0.0 && final_capital > 0.0 {
        ((final_capital / initial).powf(1.0 / years) - 1.0) * 100.0
    } else {
        0.0
    }
}

/// Realized capital at each bar: `initial_capital` plus the P&L of every
/// trade that closed on or before that bar. Trades must be in exit order.
pub fn realized_balance_curve(
    prices: &[PricePoint],
    trades: &[ClosedTrade],
    initial_capital: f64,
) -> Vec<EquityPoint> {
    let mut closed = trades.iter().peekable();
    let mut balance = initial_capital;

    prices
        .iter()
        .map(|bar| {
            while let Some(trade) = closed.next_if(|t| t.exit_date <= bar.date) {
                balance += trade.pnl;
            }
            EquityPoint {
                date: bar.date,
                equity: balance,
            }
        })
        .collect()
}

fn compute_drawdown(trades: &[ClosedTrade], initial_capital: f64) -> f64 {
    let mut peak = initial_capital;
    let mut running = initial_capital;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        running += trade.pnl;
        if running > peak {
            peak = running;
        }
        if peak > 0.0 {
            let dd = (peak - running) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

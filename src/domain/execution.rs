//! Trade execution and fill simulation.
//!
//! Implements entry/exit fills with slippage and a proportional fee, share
//! sizing, and stop-loss/take-profit trigger checks against the single
//! position slot of an [`Account`].

use chrono::NaiveDate;

use super::account::Account;
use super::position::{ExitReason, Position};
use super::strategy::{RiskConfig, StrategyConfig};

/// Cost model applied to every fill.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    /// Fee as a fraction of fill notional, e.g. 0.001.
    pub trade_fee_pct: f64,
    /// Adverse price move applied to every fill, e.g. 0.001.
    pub slippage_pct: f64,
}

/// Fee charged on a fill of `notional`.
pub fn calculate_fee(notional: f64, config: &ExecutionConfig) -> f64 {
    notional * config.trade_fee_pct
}

/// Buying pays up: market_price * (1 + slippage_pct)
pub fn apply_slippage_entry(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct)
}

/// Selling gives up: market_price * (1 - slippage_pct)
pub fn apply_slippage_exit(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct)
}

/// Why a BUY did not open a position. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyInPosition,
    ZeroQuantity,
    InsufficientCapital,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: i64,
        execution_price: f64,
        total_cost: f64,
        fee: f64,
    },
    Skipped(SkipReason),
}

/// Try to open a long position from a BUY at `market_price`.
///
/// 1. Refuse if the account already holds a position
/// 2. Size the trade off the unslipped price; refuse zero shares
/// 3. Fill at the slipped price and add the fee
/// 4. Refuse if the total cost exceeds available cash (no partial fills)
/// 5. Deduct the cost and place the position with its stop and target
pub fn enter_long(
    account: &mut Account,
    market_price: f64,
    date: NaiveDate,
    strategy: &StrategyConfig,
    risk: &RiskConfig,
    config: &ExecutionConfig,
) -> EntryResult {
    if !account.is_flat() {
        return EntryResult::Skipped(SkipReason::AlreadyInPosition);
    }

    let quantity = strategy.position_size(account.cash, market_price, risk);
    if quantity <= 0 {
        return EntryResult::Skipped(SkipReason::ZeroQuantity);
    }

    let execution_price = apply_slippage_entry(market_price, config.slippage_pct);
    let notional = quantity as f64 * execution_price;
    let fee = calculate_fee(notional, config);
    let total_cost = notional + fee;

    if total_cost > account.cash {
        return EntryResult::Skipped(SkipReason::InsufficientCapital);
    }

    let position = Position {
        id: account.next_trade_id(),
        entry_date: date,
        entry_price: execution_price,
        quantity,
        entry_fee: fee,
        stop_loss: strategy.stop_loss_price(execution_price),
        take_profit: strategy.take_profit_price(execution_price),
    };

    if account.open(position).is_err() {
        return EntryResult::Skipped(SkipReason::AlreadyInPosition);
    }
    account.cash -= total_cost;

    EntryResult::Entered {
        quantity,
        execution_price,
        total_cost,
        fee,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: i64,
    pub exit_price: f64,
    pub proceeds: f64,
    pub exit_fee: f64,
    pub pnl: f64,
    pub reason: ExitReason,
}

/// Close the open position, if any, at `market_price`.
///
/// The fill is slipped down, the fee is charged on the exit notional, the
/// net proceeds are credited to cash, and the closed trade is recorded.
pub fn exit_position(
    account: &mut Account,
    market_price: f64,
    exit_date: NaiveDate,
    reason: ExitReason,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    let position = account.take_position()?;

    let exit_price = apply_slippage_exit(market_price, config.slippage_pct);
    let exit_fee = calculate_fee(position.quantity as f64 * exit_price, config);
    let trade = position.close(exit_date, exit_price, exit_fee, reason);

    let result = ExitResult {
        quantity: trade.quantity,
        exit_price,
        proceeds: trade.proceeds(),
        exit_fee,
        pnl: trade.pnl,
        reason,
    };

    account.cash += result.proceeds;
    account.record_trade(trade);

    Some(result)
}

/// Close the open position if `price` reaches its stop or target.
pub fn check_triggers(
    account: &mut Account,
    price: f64,
    date: NaiveDate,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    let reason = account.position()?.triggered_exit(price)?;
    exit_position(account, price, date, reason, config)
}

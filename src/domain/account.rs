//! Account state owned by a single backtest run.
//!
//! The account holds at most one open position. Opening a second one while
//! the slot is occupied is refused, so the single-position rule is a property
//! of this type rather than of whoever drives it.

use chrono::NaiveDate;

use super::position::{ClosedTrade, Position};

/// Mark-to-market value of the account at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Capital available for new entries. Never negative: entries whose total
    /// cost exceeds it are rejected before any deduction.
    pub cash: f64,
    position: Option<Position>,
    closed_trades: Vec<ClosedTrade>,
    equity_curve: Vec<EquityPoint>,
    trades_opened: usize,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            cash: initial_capital,
            position: None,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
            trades_opened: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Identifier for the next position: `T1`, `T2`, ...
    pub fn next_trade_id(&self) -> String {
        format!("T{}", self.trades_opened + 1)
    }

    /// Put `position` in the slot. Returns it back if the slot is taken.
    pub fn open(&mut self, position: Position) -> Result<(), Position> {
        if self.position.is_some() {
            return Err(position);
        }
        self.trades_opened += 1;
        self.position = Some(position);
        Ok(())
    }

    pub fn take_position(&mut self) -> Option<Position> {
        self.position.take()
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.closed_trades.push(trade);
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    /// Cash plus the open position valued at `price`.
    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash
            + self
                .position
                .as_ref()
                .map_or(0.0, |pos| pos.market_value(price))
    }

    /// Append the equity at `close` to the curve.
    pub fn record_equity(&mut self, date: NaiveDate, close: f64) {
        let equity = self.total_equity(close);
        self.equity_curve.push(EquityPoint { date, equity });
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Closed trades and the equity curve, in the order they were recorded.
    pub fn into_history(self) -> (Vec<ClosedTrade>, Vec<EquityPoint>) {
        (self.closed_trades, self.equity_curve)
    }
}

//! Open positions and completed trades.
//!
//! An open trade and a closed trade are different types: a [`Position`] has
//! no exit fields at all, and a [`ClosedTrade`] always has them.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Open,
    Closed,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open => write!(f, "open"),
            TradeStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Signal => "sell signal",
            ExitReason::StopLoss => "stop loss",
            ExitReason::TakeProfit => "take profit",
            ExitReason::EndOfData => "end of data",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: String,
    pub entry_date: NaiveDate,
    /// Fill price after slippage.
    pub entry_price: f64,
    pub quantity: i64,
    pub entry_fee: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    pub fn status(&self) -> TradeStatus {
        TradeStatus::Open
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.entry_price
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        price <= self.stop_loss
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        price >= self.take_profit
    }

    /// Stop-loss is checked first, so a price that somehow satisfies both
    /// conditions exits as a stop.
    pub fn triggered_exit(&self, price: f64) -> Option<ExitReason> {
        if self.should_stop_loss(price) {
            Some(ExitReason::StopLoss)
        } else if self.should_take_profit(price) {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }

    pub fn close(
        self,
        exit_date: NaiveDate,
        exit_price: f64,
        exit_fee: f64,
        exit_reason: ExitReason,
    ) -> ClosedTrade {
        let proceeds = self.quantity as f64 * exit_price - exit_fee;
        let pnl = proceeds - self.cost_basis();
        ClosedTrade {
            id: self.id,
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            quantity: self.quantity,
            entry_fee: self.entry_fee,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            exit_date,
            exit_price,
            exit_fee,
            exit_reason,
            pnl,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub id: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub quantity: i64,
    pub entry_fee: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub exit_date: NaiveDate,
    /// Fill price after slippage.
    pub exit_price: f64,
    pub exit_fee: f64,
    pub exit_reason: ExitReason,
    /// Exit proceeds net of the exit fee, minus the entry notional.
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn status(&self) -> TradeStatus {
        TradeStatus::Closed
    }

    pub fn proceeds(&self) -> f64 {
        self.quantity as f64 * self.exit_price - self.exit_fee
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

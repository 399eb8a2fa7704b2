//! Bollinger Band + RSI mean-reversion strategy.
//!
//! Signals are produced by an ordered rule list: the first rule that fires
//! on a bar decides the signal, and a bar where no rule fires is a HOLD.

use crate::domain::indicator::BollingerBands;
use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// RSI level below which an oversold close may be bought.
    pub buy_threshold: f64,
    /// RSI level above which the position is sold.
    pub sell_threshold: f64,
    /// Fraction below entry for the stop, e.g. 0.05.
    pub stop_loss_pct: f64,
    /// Fraction above entry for the target, e.g. 0.10.
    pub take_profit_pct: f64,
    pub rsi_period: usize,
    pub bb_period: usize,
    pub bb_stddev_mult: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            buy_threshold: 30.0,
            sell_threshold: 70.0,
            stop_loss_pct: 0.05,
            take_profit_pct: 0.10,
            rsi_period: 14,
            bb_period: 20,
            bb_stddev_mult: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Accepted and reported, not enforced as a circuit breaker.
    pub max_drawdown_pct: f64,
    /// Fraction of available capital put at risk per trade.
    pub position_size_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_drawdown_pct: 0.20,
            position_size_pct: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Sell => write!(f, "SELL"),
            SignalKind::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub date: NaiveDate,
    pub kind: SignalKind,
    /// Close of the bar that produced the signal.
    pub price: f64,
    pub reason: &'static str,
}

/// Indicator readings for one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarReading {
    pub close: f64,
    pub rsi: f64,
    pub bands: BollingerBands,
}

struct SignalRule {
    kind: SignalKind,
    reason: &'static str,
    fires: fn(&BarReading, &StrategyConfig) -> bool,
}

const SIGNAL_RULES: [SignalRule; 2] = [
    SignalRule {
        kind: SignalKind::Buy,
        reason: "Price below lower BB and RSI oversold",
        fires: |bar, config| bar.close < bar.bands.lower && bar.rsi < config.buy_threshold,
    },
    SignalRule {
        kind: SignalKind::Sell,
        reason: "RSI overbought",
        fires: |bar, config| bar.rsi > config.sell_threshold,
    },
];

impl StrategyConfig {
    /// Number of leading bars skipped before any signal is evaluated.
    pub fn warmup(&self) -> usize {
        self.bb_period.max(self.rsi_period)
    }

    pub fn evaluate(&self, date: NaiveDate, reading: &BarReading) -> Signal {
        let (kind, reason) = SIGNAL_RULES
            .iter()
            .find(|rule| (rule.fires)(reading, self))
            .map_or((SignalKind::Hold, ""), |rule| (rule.kind, rule.reason));

        Signal {
            date,
            kind,
            price: reading.close,
            reason,
        }
    }

    /// Whole shares to buy at `price` given `capital`.
    ///
    /// Risks `capital * position_size_pct` against a stop `stop_loss_pct`
    /// below `price`, then caps the share count so the notional never
    /// exceeds `capital`.
    pub fn position_size(&self, capital: f64, price: f64, risk: &RiskConfig) -> i64 {
        let risk_amount = capital * risk.position_size_pct;
        let stop_distance = price * self.stop_loss_pct;

        if stop_distance <= 0.0 || capital <= 0.0 {
            return 0;
        }

        let mut shares = (risk_amount / stop_distance).floor() as i64;
        if shares as f64 * price > capital {
            shares = (capital / price).floor() as i64;
        }
        shares.max(0)
    }

    pub fn stop_loss_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_pct)
    }

    pub fn take_profit_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + self.take_profit_pct)
    }
}

/// BUY and SELL signals for `prices`, in bar order. HOLD bars are dropped.
pub fn generate_signals(prices: &[PricePoint], config: &StrategyConfig) -> Vec<Signal> {
    let warmup = config.warmup();
    if prices.len() < warmup {
        return Vec::new();
    }

    let bands = calculate_bollinger(prices, config.bb_period, config.bb_stddev_mult);
    let rsi = calculate_rsi(prices, config.rsi_period);

    let signals: Vec<Signal> = prices
        .iter()
        .enumerate()
        .skip(warmup)
        .map(|(i, bar)| {
            let reading = BarReading {
                close: bar.close,
                rsi: rsi.simple_at(i),
                bands: bands.bands_at(i),
            };
            config.evaluate(bar.date, &reading)
        })
        .filter(|signal| signal.kind != SignalKind::Hold)
        .collect();

    tracing::debug!(
        bars = prices.len(),
        warmup,
        signals = signals.len(),
        "generated signals"
    );

    signals
}

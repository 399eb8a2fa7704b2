//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average (at index `period`): simple mean of the first `period`
//!   gains/losses
//! - Subsequent: avg = (prev_avg * (period-1) + current) / period
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: indices `0..period` are invalid and carry 0.0.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price::PricePoint;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

const WARMING_UP: IndicatorPoint = IndicatorPoint {
    valid: false,
    value: IndicatorValue::Simple(0.0),
};

pub fn calculate_rsi(prices: &[PricePoint], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi(period);

    if period == 0 || prices.len() <= period {
        return IndicatorSeries {
            indicator_type,
            values: vec![WARMING_UP; prices.len()],
        };
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = prices
        .windows(2)
        .map(|w| {
            let change = w[1].close - w[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let mut values = vec![WARMING_UP; period];

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    values.push(IndicatorPoint {
        valid: true,
        value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
    });

    let smoothing = (period - 1) as f64;
    for i in (period + 1)..prices.len() {
        // gains[i - 1] is the change from bar i-1 to bar i
        avg_gain = (avg_gain * smoothing + gains[i - 1]) / period as f64;
        avg_loss = (avg_loss * smoothing + losses[i - 1]) / period as f64;
        values.push(IndicatorPoint {
            valid: true,
            value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

//! Bollinger Bands.
//!
//! - Middle: simple moving average over `period` closes
//! - Upper: middle + (multiplier × stddev)
//! - Lower: middle - (multiplier × stddev)
//!
//! Stddev is the population form (divides by N).
//! Warmup: first `period - 1` bars are invalid and carry {0, 0, 0}.

use crate::domain::indicator::stddev::{mean, population_stddev};
use crate::domain::indicator::{
    BollingerBands, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::price::{PricePoint, closes};

pub fn calculate_bollinger(
    prices: &[PricePoint],
    period: usize,
    stddev_mult: f64,
) -> IndicatorSeries {
    let close_values = closes(prices);
    let mut values = Vec::with_capacity(prices.len());

    for i in 0..close_values.len() {
        let valid = period > 0 && i + 1 >= period;

        let bands = if valid {
            let window = &close_values[i + 1 - period..=i];
            let middle = mean(window);
            let stddev = population_stddev(window, middle);
            BollingerBands {
                upper: middle + stddev_mult * stddev,
                middle,
                lower: middle - stddev_mult * stddev,
            }
        } else {
            BollingerBands::default()
        };

        values.push(IndicatorPoint {
            valid,
            value: IndicatorValue::Bollinger(bands),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult,
        },
        values,
    }
}

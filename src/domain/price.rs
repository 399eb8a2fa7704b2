//! Daily price bar for a single asset.

use chrono::NaiveDate;

/// One trading day. Series of these are ordered ascending by date with
/// unique dates; the CSV adapter guarantees that before the engine sees them.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: i64,
}

impl PricePoint {
    /// A bar where every price field equals `close`.
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        PricePoint {
            date,
            open: close,
            high: close,
            low: close,
            close,
            adjusted_close: close,
            volume: 0,
        }
    }
}

/// Closing prices of `prices`, index-aligned.
pub fn closes(prices: &[PricePoint]) -> Vec<f64> {
    prices.iter().map(|p| p.close).collect()
}

/// Keep bars whose date falls inside `[start, end]`, both bounds inclusive.
pub fn filter_by_date_range(
    prices: Vec<PricePoint>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<PricePoint> {
    prices
        .into_iter()
        .filter(|p| start.is_none_or(|s| p.date >= s) && end.is_none_or(|e| p.date <= e))
        .collect()
}

//! Technical indicators consumed by the signal evaluator.
//!
//! Every calculator returns an [`IndicatorSeries`] with exactly one point per
//! input bar. Bars inside the warm-up window are kept as invalid points whose
//! value is the zero sentinel, so index `i` of a series always lines up with
//! index `i` of the price series.

pub mod bollinger;
pub mod rsi;
pub mod stddev;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Bollinger(BollingerBands),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Rsi(usize),
    Bollinger { period: usize, stddev_mult: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn valid_value(&self, index: usize) -> Option<IndicatorValue> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    /// Scalar value at `index`; 0.0 when out of range, still warming up, or
    /// not a scalar series.
    pub fn simple_at(&self, index: usize) -> f64 {
        match self.valid_value(index) {
            Some(IndicatorValue::Simple(v)) => v,
            _ => 0.0,
        }
    }

    /// Band triple at `index`; all zeros when out of range, still warming up,
    /// or not a band series.
    pub fn bands_at(&self, index: usize) -> BollingerBands {
        match self.valid_value(index) {
            Some(IndicatorValue::Bollinger(bands)) => bands,
            _ => BollingerBands::default(),
        }
    }
}

//! Window statistics shared by the band indicators.
//!
//! Standard deviation here is the population form: squared deviations are
//! divided by N, not N-1.

/// Arithmetic mean; 0.0 for an empty window.
pub fn mean(window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// Population standard deviation around `mean`; 0.0 for an empty window.
pub fn population_stddev(window: &[f64], mean: f64) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / window.len() as f64;
    variance.sqrt()
}

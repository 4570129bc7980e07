//! Rolling standard deviation.
//!
//! Population standard deviation (divides by n, not n-1) over each window.

use super::window::window_count;

pub fn stddev(values: &[f64], period: usize) -> Vec<f64> {
    let count = window_count(values.len(), period);
    (0..count)
        .map(|start| window_stddev(&values[start..start + period]))
        .collect()
}

/// Population standard deviation of a non-empty window.
pub(crate) fn window_stddev(window: &[f64]) -> f64 {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}

//! Weighted Moving Average.
//!
//! Linear weights 1..=n, the most recent value weighted n.
//! WMA(n)[i] = sum(C[i-n+1+j] * (j+1)) / (n*(n+1)/2)

use super::window::window_count;

pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let count = window_count(values.len(), period);
    let denominator = period as f64 * (period as f64 + 1.0) / 2.0;
    (0..count)
        .map(|start| {
            values[start..start + period]
                .iter()
                .enumerate()
                .map(|(j, v)| v * (j + 1) as f64)
                .sum::<f64>()
                / denominator
        })
        .collect()
}

//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(C[i-n+1..=i]) / n
//! Output length: N - n + 1.

use super::window::window_count;

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let count = window_count(values.len(), period);
    let mut out = Vec::with_capacity(count);
    if count == 0 {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out.push(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out.push(sum / period as f64);
    }
    out
}

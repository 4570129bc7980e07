//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Output length: N - n + 1.

use super::window::window_count;

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let count = window_count(values.len(), period);
    let mut out = Vec::with_capacity(count);
    if count == 0 {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out.push(ema);
    for &value in &values[period..] {
        ema = value * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

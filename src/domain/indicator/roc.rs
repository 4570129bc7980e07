//! Rate of Change.
//!
//! ROC(n)[i] = (C[i] - C[i-n]) / C[i-n] * 100
//! A zero reference price yields 0.
//! Output length: N - n.

pub fn roc(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() <= period {
        return Vec::new();
    }
    values
        .windows(period + 1)
        .map(|w| {
            let base = w[0];
            if base == 0.0 {
                0.0
            } else {
                (w[period] - base) / base * 100.0
            }
        })
        .collect()
}

//! Commodity Channel Index.
//!
//! TP = (H + L + C) / 3
//! CCI = (TP - SMA(TP, n)) / (0.015 * MAD(TP, n)), 0 when MAD is 0.

use super::window::window_count;
use crate::domain::ohlcv::typical_price;

const LAMBERT: f64 = 0.015;

pub fn cci(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let tp: Vec<f64> = (0..n).map(|i| typical_price(high[i], low[i], close[i])).collect();

    (0..window_count(n, period))
        .map(|start| {
            let window = &tp[start..start + period];
            let mean = window.iter().sum::<f64>() / period as f64;
            let mad = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
            if mad == 0.0 {
                0.0
            } else {
                (window[period - 1] - mean) / (LAMBERT * mad)
            }
        })
        .collect()
}

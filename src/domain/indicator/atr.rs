//! Average True Range.
//!
//! TR[0] = H - L, TR[i] = max(H - L, |H - C[i-1]|, |L - C[i-1]|)
//! ATR(n) = SMA(TR, n)

use super::sma::sma;
use crate::domain::ohlcv::true_range;

pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let ranges: Vec<f64> = (0..n)
        .map(|i| {
            if i == 0 {
                high[0] - low[0]
            } else {
                true_range(high[i], low[i], close[i - 1])
            }
        })
        .collect();
    sma(&ranges, period)
}

//! Money Flow Index.
//!
//! Raw money flow = TP * volume, classed positive or negative by the
//! direction of TP against the previous bar (unchanged bars count as
//! neither). Over the trailing n flows:
//! MFI = 100 - 100 / (1 + positive / negative), 100 when negative is 0.
//!
//! Output length: N - n.

use crate::domain::ohlcv::typical_price;

pub fn mfi(high: &[f64], low: &[f64], close: &[f64], volume: &[f64], period: usize) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len()).min(volume.len());
    if period == 0 || n <= period {
        return Vec::new();
    }

    let tp: Vec<f64> = (0..n).map(|i| typical_price(high[i], low[i], close[i])).collect();
    // (positive, negative) flow for each bar after the first
    let flows: Vec<(f64, f64)> = (1..n)
        .map(|i| {
            let raw = tp[i] * volume[i];
            if tp[i] > tp[i - 1] {
                (raw, 0.0)
            } else if tp[i] < tp[i - 1] {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    flows
        .windows(period)
        .map(|w| {
            let positive: f64 = w.iter().map(|f| f.0).sum();
            let negative: f64 = w.iter().map(|f| f.1).sum();
            if negative == 0.0 {
                100.0
            } else {
                (100.0 - 100.0 / (1.0 + positive / negative)).clamp(0.0, 100.0)
            }
        })
        .collect()
}

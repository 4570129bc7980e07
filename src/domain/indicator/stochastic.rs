//! Stochastic Oscillator.
//!
//! %K = (C - LL(k)) / (HH(k) - LL(k)) * 100, 50 when the window is flat.
//! %D = SMA(%K, d)

use super::sma::sma;
use super::window::range_windows;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StochasticLines {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticLines {
    let offset = k_period.saturating_sub(1);
    let k: Vec<f64> = range_windows(high, low, k_period)
        .zip(close.iter().skip(offset))
        .map(|((hh, ll), c)| {
            let range = hh - ll;
            if range == 0.0 {
                50.0
            } else {
                (c - ll) / range * 100.0
            }
        })
        .collect();
    let d = sma(&k, d_period);
    StochasticLines { k, d }
}

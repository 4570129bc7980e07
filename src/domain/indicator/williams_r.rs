//! Williams %R.
//!
//! %R = (HH(n) - C) / (HH(n) - LL(n)) * -100, -50 when the window is flat.

use super::window::range_windows;

pub fn williams_r(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let offset = period.saturating_sub(1);
    range_windows(high, low, period)
        .zip(close.iter().skip(offset))
        .map(|((hh, ll), c)| {
            let range = hh - ll;
            if range == 0.0 {
                -50.0
            } else {
                (hh - c) / range * -100.0
            }
        })
        .collect()
}

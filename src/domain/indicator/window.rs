//! Trailing-window helpers shared by the range-based oscillators.

/// Yields `(highest, lowest)` for each trailing window of `period` bars,
/// starting at the first full window.
pub(crate) fn range_windows<'a>(
    high: &'a [f64],
    low: &'a [f64],
    period: usize,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    let n = high.len().min(low.len());
    let start = if period == 0 || n < period { n } else { period - 1 };
    (start..n).map(move |i| {
        let from = i + 1 - period;
        let hh = high[from..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ll = low[from..=i].iter().copied().fold(f64::INFINITY, f64::min);
        (hh, ll)
    })
}

/// Number of full windows of `period` over `len` values.
pub(crate) fn window_count(len: usize, period: usize) -> usize {
    if period == 0 || len < period {
        0
    } else {
        len - period + 1
    }
}

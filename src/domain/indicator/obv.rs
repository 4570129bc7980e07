//! On-Balance Volume.
//!
//! OBV[0] = 0; then add the bar's volume on an up close, subtract it on a
//! down close, carry forward on an unchanged close.

pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len().min(volume.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }

    let mut running = 0.0;
    out.push(running);
    for i in 1..n {
        if close[i] > close[i - 1] {
            running += volume[i];
        } else if close[i] < close[i - 1] {
            running -= volume[i];
        }
        out.push(running);
    }
    out
}

//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Lines are aligned by their last element. The MACD line starts once both
//! EMAs exist (max(fast, slow) bars), the signal and histogram
//! `signal - 1` bars later.

use super::ema::ema;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdLines {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdLines {
    if fast == 0 || slow == 0 || signal == 0 {
        return MacdLines::default();
    }

    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    let len = ema_fast.len().min(ema_slow.len());
    let fast_tail = &ema_fast[ema_fast.len() - len..];
    let slow_tail = &ema_slow[ema_slow.len() - len..];

    let macd_line: Vec<f64> = fast_tail
        .iter()
        .zip(slow_tail)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema(&macd_line, signal);
    let offset = macd_line.len() - signal_line.len();
    let histogram = macd_line[offset..]
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    MacdLines {
        macd: macd_line,
        signal: signal_line,
        histogram,
    }
}

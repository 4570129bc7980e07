//! OHLCV bar and series representation.
//!
//! `OhlcvBar` is one row as fetched from a data source. `OhlcvSeries` is the
//! column layout the indicator engine works on: `close` is mandatory, the
//! other columns are optional but always the same length as `close`.
//! `OhlcvView` is a borrowed, cheaply copyable window over a series.

use crate::domain::error::RulecraftError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// (high + low + close) / 3
pub(crate) fn typical_price(high: f64, low: f64, close: f64) -> f64 {
    (high + low + close) / 3.0
}

/// max(high - low, |high - prev_close|, |low - prev_close|)
pub(crate) fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let hl = high - low;
    let hc = (high - prev_close).abs();
    let lc = (low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// A price column that rules and indicator sources can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl PriceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" | "price" => Ok(PriceField::Close),
            other => Err(format!("unknown price field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OhlcvSeries {
    dates: Vec<NaiveDateTime>,
    open: Option<Vec<f64>>,
    high: Option<Vec<f64>>,
    low: Option<Vec<f64>>,
    close: Vec<f64>,
    volume: Option<Vec<f64>>,
}

impl OhlcvSeries {
    /// A close-only series.
    pub fn from_close(close: Vec<f64>) -> Self {
        Self {
            close,
            ..Self::default()
        }
    }

    /// Columnar copy of bars, assumed ordered oldest to newest.
    pub fn from_bars(bars: &[OhlcvBar]) -> Self {
        Self {
            dates: bars.iter().map(|b| b.date).collect(),
            open: Some(bars.iter().map(|b| b.open).collect()),
            high: Some(bars.iter().map(|b| b.high).collect()),
            low: Some(bars.iter().map(|b| b.low).collect()),
            close: bars.iter().map(|b| b.close).collect(),
            volume: Some(bars.iter().map(|b| b.volume).collect()),
        }
    }

    pub fn with_open(mut self, open: Vec<f64>) -> Result<Self, RulecraftError> {
        self.check_len("open", open.len())?;
        self.open = Some(open);
        Ok(self)
    }

    pub fn with_high(mut self, high: Vec<f64>) -> Result<Self, RulecraftError> {
        self.check_len("high", high.len())?;
        self.high = Some(high);
        Ok(self)
    }

    pub fn with_low(mut self, low: Vec<f64>) -> Result<Self, RulecraftError> {
        self.check_len("low", low.len())?;
        self.low = Some(low);
        Ok(self)
    }

    pub fn with_volume(mut self, volume: Vec<f64>) -> Result<Self, RulecraftError> {
        self.check_len("volume", volume.len())?;
        self.volume = Some(volume);
        Ok(self)
    }

    pub fn with_dates(mut self, dates: Vec<NaiveDateTime>) -> Result<Self, RulecraftError> {
        self.check_len("date", dates.len())?;
        self.dates = dates;
        Ok(self)
    }

    fn check_len(&self, field: &str, actual: usize) -> Result<(), RulecraftError> {
        if actual != self.close.len() {
            return Err(RulecraftError::SeriesLengthMismatch {
                field: field.to_string(),
                expected: self.close.len(),
                actual,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Timestamps, empty when the series was built without them.
    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    pub fn view(&self) -> OhlcvView<'_> {
        OhlcvView {
            open: self.open.as_deref(),
            high: self.high.as_deref(),
            low: self.low.as_deref(),
            close: &self.close,
            volume: self.volume.as_deref(),
        }
    }
}

impl<'a> From<&'a OhlcvSeries> for OhlcvView<'a> {
    fn from(series: &'a OhlcvSeries) -> Self {
        series.view()
    }
}

/// Borrowed columns of equal length. Only [`OhlcvSeries::view`] builds one.
#[derive(Debug, Clone, Copy)]
pub struct OhlcvView<'a> {
    open: Option<&'a [f64]>,
    high: Option<&'a [f64]>,
    low: Option<&'a [f64]>,
    close: &'a [f64],
    volume: Option<&'a [f64]>,
}

impl<'a> OhlcvView<'a> {
    pub fn close(&self) -> &'a [f64] {
        self.close
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// The first `len` bars; what the market looked like at bar `len - 1`.
    pub fn prefix(&self, len: usize) -> OhlcvView<'a> {
        let len = len.min(self.close.len());
        OhlcvView {
            open: self.open.map(|s| &s[..len]),
            high: self.high.map(|s| &s[..len]),
            low: self.low.map(|s| &s[..len]),
            close: &self.close[..len],
            volume: self.volume.map(|s| &s[..len]),
        }
    }

    pub fn field(&self, field: PriceField) -> Option<&'a [f64]> {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => Some(self.close),
        }
    }

    /// The named column, or `MissingSeries` on behalf of `requester`.
    pub fn require(
        &self,
        field: PriceField,
        requester: impl fmt::Display,
    ) -> Result<&'a [f64], RulecraftError> {
        self.field(field)
            .ok_or_else(|| RulecraftError::missing_series(field.as_str(), requester))
    }

    pub fn require_volume(
        &self,
        requester: impl fmt::Display,
    ) -> Result<&'a [f64], RulecraftError> {
        self.volume
            .ok_or_else(|| RulecraftError::missing_series("volume", requester))
    }
}

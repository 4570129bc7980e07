//! Technical indicator engine.
//!
//! - `IndicatorName`: the closed set of supported indicators, parsed once
//!   from the free-form names strategies store
//! - `IndicatorType`: indicator identity + resolved parameters
//! - `IndicatorSpec`: an `IndicatorType` plus the price column it reads
//! - `IndicatorField`: which line of a multi-line indicator to use
//! - `IndicatorResult`: computed lines, each aligned to the last input bar
//!
//! Every line is compact: element `len - 1` is the value at the most recent
//! bar and no value is produced before the indicator has enough history.

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod williams_r;
pub mod wma;
mod window;

use crate::domain::error::RulecraftError;
use crate::domain::ohlcv::{OhlcvView, PriceField};
use crate::domain::params::{resolve_spec, IndicatorParams};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use atr::atr;
pub use bollinger::{bollinger, BollingerBands};
pub use cci::cci;
pub use ema::ema;
pub use macd::{macd, MacdLines};
pub use mfi::mfi;
pub use obv::obv;
pub use roc::roc;
pub use rsi::rsi;
pub use sma::sma;
pub use stddev::stddev;
pub use stochastic::{stochastic, StochasticLines};
pub use williams_r::williams_r;
pub use wma::wma;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndicatorName {
    Sma,
    Ema,
    Wma,
    Rsi,
    Roc,
    StdDev,
    Macd,
    BollingerBands,
    Stochastic,
    Atr,
    Cci,
    WilliamsR,
    Mfi,
    Obv,
}

/// Spellings accepted after normalization (lowercase, whitespace removed).
const NAME_TABLE: &[(IndicatorName, &[&str])] = &[
    (IndicatorName::Sma, &["sma", "simplemovingaverage", "movingaverage", "ma"]),
    (IndicatorName::Ema, &["ema", "exponentialmovingaverage"]),
    (IndicatorName::Wma, &["wma", "weightedmovingaverage"]),
    (IndicatorName::Rsi, &["rsi", "relativestrengthindex"]),
    (IndicatorName::Roc, &["roc", "rateofchange"]),
    (IndicatorName::StdDev, &["stddev", "standarddeviation", "stdev"]),
    (IndicatorName::Macd, &["macd", "movingaverageconvergencedivergence"]),
    (
        IndicatorName::BollingerBands,
        &["bollingerbands", "bollinger", "bbands", "bb"],
    ),
    (
        IndicatorName::Stochastic,
        &["stochastic", "stoch", "stochasticoscillator"],
    ),
    (IndicatorName::Atr, &["atr", "averagetruerange"]),
    (IndicatorName::Cci, &["cci", "commoditychannelindex"]),
    (
        IndicatorName::WilliamsR,
        &["williams%r", "williamsr", "willr", "williams"],
    ),
    (IndicatorName::Mfi, &["mfi", "moneyflowindex"]),
    (IndicatorName::Obv, &["obv", "onbalancevolume"]),
];

/// Lowercase and strip all whitespace.
pub fn normalize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl IndicatorName {
    pub const ALL: &'static [IndicatorName] = &[
        IndicatorName::Sma,
        IndicatorName::Ema,
        IndicatorName::Wma,
        IndicatorName::Rsi,
        IndicatorName::Roc,
        IndicatorName::StdDev,
        IndicatorName::Macd,
        IndicatorName::BollingerBands,
        IndicatorName::Stochastic,
        IndicatorName::Atr,
        IndicatorName::Cci,
        IndicatorName::WilliamsR,
        IndicatorName::Mfi,
        IndicatorName::Obv,
    ];

    /// The `valueType` options an indicator declares, primary first.
    pub fn value_types(&self) -> &'static [&'static str] {
        match self {
            IndicatorName::Macd => &["MACD Value", "Signal Value", "Histogram Value"],
            IndicatorName::BollingerBands => &["Middle Band", "Upper Band", "Lower Band"],
            IndicatorName::Stochastic => &["K Value", "D Value"],
            _ => &["Value"],
        }
    }
}

impl fmt::Display for IndicatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndicatorName::Sma => "SMA",
            IndicatorName::Ema => "EMA",
            IndicatorName::Wma => "WMA",
            IndicatorName::Rsi => "RSI",
            IndicatorName::Roc => "ROC",
            IndicatorName::StdDev => "STDDEV",
            IndicatorName::Macd => "MACD",
            IndicatorName::BollingerBands => "BOLLINGER",
            IndicatorName::Stochastic => "STOCHASTIC",
            IndicatorName::Atr => "ATR",
            IndicatorName::Cci => "CCI",
            IndicatorName::WilliamsR => "WILLIAMS_R",
            IndicatorName::Mfi => "MFI",
            IndicatorName::Obv => "OBV",
        };
        f.write_str(s)
    }
}

impl FromStr for IndicatorName {
    type Err = RulecraftError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_name(raw);
        NAME_TABLE
            .iter()
            .find(|(_, spellings)| spellings.contains(&normalized.as_str()))
            .map(|(name, _)| *name)
            .ok_or_else(|| RulecraftError::UnsupportedIndicator {
                name: raw.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Wma(usize),
    Rsi(usize),
    Roc(usize),
    StdDev(usize),
    Atr(usize),
    Cci(usize),
    WilliamsR(usize),
    Mfi(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        deviation: f64,
    },
}

impl IndicatorType {
    pub fn name(&self) -> IndicatorName {
        match self {
            IndicatorType::Sma(_) => IndicatorName::Sma,
            IndicatorType::Ema(_) => IndicatorName::Ema,
            IndicatorType::Wma(_) => IndicatorName::Wma,
            IndicatorType::Rsi(_) => IndicatorName::Rsi,
            IndicatorType::Roc(_) => IndicatorName::Roc,
            IndicatorType::StdDev(_) => IndicatorName::StdDev,
            IndicatorType::Atr(_) => IndicatorName::Atr,
            IndicatorType::Cci(_) => IndicatorName::Cci,
            IndicatorType::WilliamsR(_) => IndicatorName::WilliamsR,
            IndicatorType::Mfi(_) => IndicatorName::Mfi,
            IndicatorType::Obv => IndicatorName::Obv,
            IndicatorType::Macd { .. } => IndicatorName::Macd,
            IndicatorType::Stochastic { .. } => IndicatorName::Stochastic,
            IndicatorType::Bollinger { .. } => IndicatorName::BollingerBands,
        }
    }

    /// Minimum number of bars for the primary line to have one value.
    pub fn required_bars(&self) -> usize {
        match self {
            IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::Wma(p)
            | IndicatorType::StdDev(p)
            | IndicatorType::Atr(p)
            | IndicatorType::Cci(p)
            | IndicatorType::WilliamsR(p)
            | IndicatorType::Bollinger { period: p, .. } => *p,
            IndicatorType::Rsi(p) | IndicatorType::Roc(p) | IndicatorType::Mfi(p) => {
                p.saturating_add(1)
            }
            IndicatorType::Obv => 1,
            IndicatorType::Macd { fast, slow, .. } => *fast.max(slow),
            IndicatorType::Stochastic { k_period, .. } => *k_period,
        }
    }

    /// Bars needed for `field` to have a value.
    pub fn required_bars_for(&self, field: IndicatorField) -> usize {
        match field {
            IndicatorField::MacdSignal
            | IndicatorField::MacdHistogram
            | IndicatorField::StochasticD => self.required_bars_all_lines(),
            _ => self.required_bars(),
        }
    }

    /// Bars needed for every line (signal, %D) to have a value.
    pub fn required_bars_all_lines(&self) -> usize {
        match self {
            IndicatorType::Macd { fast, slow, signal } => {
                (*fast.max(slow)).saturating_add(*signal).saturating_sub(1)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                k_period.saturating_add(*d_period).saturating_sub(1)
            }
            other => other.required_bars(),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Wma(period) => write!(f, "WMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::StdDev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::WilliamsR(period) => write!(f, "WILLIAMS_R({})", period),
            IndicatorType::Mfi(period) => write!(f, "MFI({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Bollinger { period, deviation } => {
                write!(f, "BOLLINGER({},{})", period, deviation)
            }
        }
    }
}

/// A fully resolved indicator: identity, parameters and input column.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    pub indicator_type: IndicatorType,
    pub source: PriceField,
}

impl IndicatorSpec {
    pub fn new(indicator_type: IndicatorType) -> Self {
        Self {
            indicator_type,
            source: PriceField::Close,
        }
    }

    pub fn with_source(mut self, source: PriceField) -> Self {
        self.source = source;
        self
    }

    /// Parse a free-form name and resolve its parameters.
    pub fn resolve(name: &str, params: &IndicatorParams) -> Result<Self, RulecraftError> {
        let name: IndicatorName = name.parse()?;
        resolve_spec(name, params)
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source == PriceField::Close {
            write!(f, "{}", self.indicator_type)
        } else {
            write!(f, "{}[{}]", self.indicator_type, self.source)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    StochasticK,
    StochasticD,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
}

impl IndicatorField {
    pub fn primary(name: IndicatorName) -> Self {
        match name {
            IndicatorName::Macd => IndicatorField::MacdLine,
            IndicatorName::BollingerBands => IndicatorField::BollingerMiddle,
            IndicatorName::Stochastic => IndicatorField::StochasticK,
            _ => IndicatorField::Value,
        }
    }

    /// Map a stored `valueType` onto one of the indicator's lines.
    /// Anything unrecognized selects the primary line.
    pub fn from_value_type(name: IndicatorName, value_type: Option<&str>) -> Self {
        let Some(raw) = value_type else {
            return Self::primary(name);
        };
        let vt = normalize_name(raw);
        let field = match name {
            IndicatorName::Macd => match vt.as_str() {
                "macdvalue" | "macd" | "macdline" => Some(IndicatorField::MacdLine),
                "signalvalue" | "signal" | "signalline" => Some(IndicatorField::MacdSignal),
                "histogramvalue" | "histogram" | "hist" => Some(IndicatorField::MacdHistogram),
                _ => None,
            },
            IndicatorName::BollingerBands => match vt.as_str() {
                "upperband" | "upper" | "uppervalue" => Some(IndicatorField::BollingerUpper),
                "middleband" | "middle" | "middlevalue" | "basis" => {
                    Some(IndicatorField::BollingerMiddle)
                }
                "lowerband" | "lower" | "lowervalue" => Some(IndicatorField::BollingerLower),
                _ => None,
            },
            IndicatorName::Stochastic => match vt.as_str() {
                "kvalue" | "k" | "%k" | "%kvalue" | "kline" => Some(IndicatorField::StochasticK),
                "dvalue" | "d" | "%d" | "%dvalue" | "dline" => Some(IndicatorField::StochasticD),
                _ => None,
            },
            _ => None,
        };
        field.unwrap_or_else(|| Self::primary(name))
    }
}

/// Computed lines, shaped by indicator family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum IndicatorOutput {
    Single {
        values: Vec<f64>,
    },
    Macd {
        macd: Vec<f64>,
        signal: Vec<f64>,
        histogram: Vec<f64>,
    },
    Bollinger {
        upper: Vec<f64>,
        middle: Vec<f64>,
        lower: Vec<f64>,
    },
    Stochastic {
        k: Vec<f64>,
        d: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorResult {
    pub spec: IndicatorSpec,
    pub output: IndicatorOutput,
}

impl IndicatorResult {
    /// The requested line; a field that does not belong to this indicator
    /// selects the primary line.
    pub fn line(&self, field: IndicatorField) -> &[f64] {
        match (&self.output, field) {
            (IndicatorOutput::Macd { signal, .. }, IndicatorField::MacdSignal) => signal,
            (IndicatorOutput::Macd { histogram, .. }, IndicatorField::MacdHistogram) => histogram,
            (IndicatorOutput::Bollinger { upper, .. }, IndicatorField::BollingerUpper) => upper,
            (IndicatorOutput::Bollinger { lower, .. }, IndicatorField::BollingerLower) => lower,
            (IndicatorOutput::Stochastic { d, .. }, IndicatorField::StochasticD) => d,
            _ => self.values(),
        }
    }

    /// Full primary series.
    pub fn values(&self) -> &[f64] {
        match &self.output {
            IndicatorOutput::Single { values } => values,
            IndicatorOutput::Macd { macd, .. } => macd,
            IndicatorOutput::Bollinger { middle, .. } => middle,
            IndicatorOutput::Stochastic { k, .. } => k,
        }
    }

    /// Latest primary value.
    pub fn value(&self) -> Option<f64> {
        self.values().last().copied()
    }

    pub fn latest(&self, field: IndicatorField) -> Option<f64> {
        self.line(field).last().copied()
    }
}

/// Compute an indicator by its stored name and raw parameter set.
pub fn calculate_indicator<'a>(
    name: &str,
    input: impl Into<OhlcvView<'a>>,
    params: &IndicatorParams,
) -> Result<IndicatorResult, RulecraftError> {
    let spec = IndicatorSpec::resolve(name, params)?;
    calculate(&spec, input.into())
}

/// Compute an already resolved indicator over `input`.
pub fn calculate(spec: &IndicatorSpec, input: OhlcvView<'_>) -> Result<IndicatorResult, RulecraftError> {
    let source = || input.require(spec.source, spec);
    let high = || input.require(PriceField::High, spec);
    let low = || input.require(PriceField::Low, spec);

    let output = match spec.indicator_type {
        IndicatorType::Sma(p) => IndicatorOutput::Single {
            values: sma(source()?, p),
        },
        IndicatorType::Ema(p) => IndicatorOutput::Single {
            values: ema(source()?, p),
        },
        IndicatorType::Wma(p) => IndicatorOutput::Single {
            values: wma(source()?, p),
        },
        IndicatorType::Rsi(p) => IndicatorOutput::Single {
            values: rsi(source()?, p),
        },
        IndicatorType::Roc(p) => IndicatorOutput::Single {
            values: roc(source()?, p),
        },
        IndicatorType::StdDev(p) => IndicatorOutput::Single {
            values: stddev(source()?, p),
        },
        IndicatorType::Atr(p) => IndicatorOutput::Single {
            values: atr(high()?, low()?, input.close(), p),
        },
        IndicatorType::Cci(p) => IndicatorOutput::Single {
            values: cci(high()?, low()?, input.close(), p),
        },
        IndicatorType::WilliamsR(p) => IndicatorOutput::Single {
            values: williams_r(high()?, low()?, input.close(), p),
        },
        IndicatorType::Mfi(p) => IndicatorOutput::Single {
            values: mfi(high()?, low()?, input.close(), input.require_volume(spec)?, p),
        },
        IndicatorType::Obv => IndicatorOutput::Single {
            values: obv(input.close(), input.require_volume(spec)?),
        },
        IndicatorType::Macd { fast, slow, signal } => {
            let lines = macd(source()?, fast, slow, signal);
            IndicatorOutput::Macd {
                macd: lines.macd,
                signal: lines.signal,
                histogram: lines.histogram,
            }
        }
        IndicatorType::Bollinger { period, deviation } => {
            let bands = bollinger(source()?, period, deviation);
            IndicatorOutput::Bollinger {
                upper: bands.upper,
                middle: bands.middle,
                lower: bands.lower,
            }
        }
        IndicatorType::Stochastic { k_period, d_period } => {
            let lines = stochastic(high()?, low()?, input.close(), k_period, d_period);
            IndicatorOutput::Stochastic {
                k: lines.k,
                d: lines.d,
            }
        }
    };

    Ok(IndicatorResult {
        spec: spec.clone(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvSeries;
    use approx::assert_abs_diff_eq;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
        let boll = IndicatorType::Bollinger {
            period: 20,
            deviation: 2.5,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,2.5)");
        let spec = IndicatorSpec::new(IndicatorType::Ema(9)).with_source(PriceField::High);
        assert_eq!(spec.to_string(), "EMA(9)[high]");
    }

    #[test]
    fn name_normalization() {
        assert_eq!("Bollinger Bands".parse::<IndicatorName>().unwrap(), IndicatorName::BollingerBands);
        assert_eq!("  rsi ".parse::<IndicatorName>().unwrap(), IndicatorName::Rsi);
        assert_eq!("Williams %R".parse::<IndicatorName>().unwrap(), IndicatorName::WilliamsR);
        assert_eq!("MFI".parse::<IndicatorName>().unwrap(), IndicatorName::Mfi);
        assert_eq!("Stochastic Oscillator".parse::<IndicatorName>().unwrap(), IndicatorName::Stochastic);
    }

    #[test]
    fn unsupported_name_is_reported_verbatim() {
        let err = "Ichimoku Cloud".parse::<IndicatorName>().unwrap_err();
        match err {
            RulecraftError::UnsupportedIndicator { name } => assert_eq!(name, "Ichimoku Cloud"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn every_name_parses_from_its_display() {
        for name in IndicatorName::ALL {
            let display = name.to_string();
            assert_eq!(display.parse::<IndicatorName>().ok(), Some(*name), "{}", display);
        }
    }

    #[test]
    fn value_type_selection() {
        use IndicatorField::*;
        let cases = [
            (IndicatorName::Macd, Some("MACD Value"), MacdLine),
            (IndicatorName::Macd, Some("Signal Value"), MacdSignal),
            (IndicatorName::Macd, Some("Histogram Value"), MacdHistogram),
            (IndicatorName::Macd, Some("nonsense"), MacdLine),
            (IndicatorName::BollingerBands, Some("Upper Band"), BollingerUpper),
            (IndicatorName::BollingerBands, Some("lower"), BollingerLower),
            (IndicatorName::BollingerBands, None, BollingerMiddle),
            (IndicatorName::Stochastic, Some("D Value"), StochasticD),
            (IndicatorName::Stochastic, Some("%K"), StochasticK),
            (IndicatorName::Rsi, Some("Signal Value"), Value),
        ];
        for (name, vt, expected) in cases {
            assert_eq!(IndicatorField::from_value_type(name, vt), expected, "{} {:?}", name, vt);
        }
    }

    #[test]
    fn declared_value_types_map_to_distinct_lines() {
        for name in IndicatorName::ALL {
            let fields: Vec<_> = name
                .value_types()
                .iter()
                .map(|vt| IndicatorField::from_value_type(*name, Some(vt)))
                .collect();
            assert_eq!(fields[0], IndicatorField::primary(*name));
            for (i, f) in fields.iter().enumerate() {
                assert!(!fields[..i].contains(f), "{} has duplicate line {:?}", name, f);
            }
        }
    }

    #[test]
    fn calculate_indicator_sma_by_name() {
        let series = OhlcvSeries::from_close(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let params = IndicatorParams::new().with("period", 3);
        let result = calculate_indicator("SMA", &series, &params).unwrap();
        assert_eq!(result.values(), &[2.0, 3.0, 4.0]);
        assert_eq!(result.value(), Some(4.0));
    }

    #[test]
    fn calculate_indicator_uses_source_column() {
        let series = OhlcvSeries::from_close(vec![1.0, 2.0, 3.0])
            .with_high(vec![10.0, 20.0, 30.0])
            .unwrap();
        let params = IndicatorParams::new().with("period", 2).with("source", "high");
        let result = calculate_indicator("sma", &series, &params).unwrap();
        assert_eq!(result.values(), &[15.0, 25.0]);
    }

    #[test]
    fn missing_series_is_an_error() {
        let series = OhlcvSeries::from_close(vec![1.0, 2.0, 3.0]);
        let params = IndicatorParams::new();

        for name in ["ATR", "CCI", "Williams %R", "Stochastic"] {
            let err = calculate_indicator(name, &series, &params).unwrap_err();
            assert!(
                matches!(err, RulecraftError::MissingSeries { ref field, .. } if field == "high"),
                "{}: {}",
                name,
                err
            );
        }

        let series = series
            .with_high(vec![2.0, 3.0, 4.0])
            .unwrap()
            .with_low(vec![0.5, 1.5, 2.5])
            .unwrap();
        let err = calculate_indicator("MFI", &series, &params).unwrap_err();
        assert!(matches!(err, RulecraftError::MissingSeries { ref field, .. } if field == "volume"));
    }

    #[test]
    fn unsupported_indicator_error() {
        let series = OhlcvSeries::from_close(vec![1.0, 2.0, 3.0]);
        let err = calculate_indicator("vwap", &series, &IndicatorParams::new()).unwrap_err();
        assert!(matches!(err, RulecraftError::UnsupportedIndicator { .. }));
    }

    #[test]
    fn short_input_yields_empty_lines() {
        let series = OhlcvSeries::from_close(vec![1.0, 2.0]);
        let result = calculate_indicator("RSI", &series, &IndicatorParams::new()).unwrap();
        assert!(result.values().is_empty());
        assert_eq!(result.value(), None);
    }

    #[test]
    fn macd_lines_are_selectable() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let series = OhlcvSeries::from_close(closes);
        let result = calculate_indicator("MACD", &series, &IndicatorParams::new()).unwrap();

        let macd_line = result.latest(IndicatorField::MacdLine).unwrap();
        let signal = result.latest(IndicatorField::MacdSignal).unwrap();
        let histogram = result.latest(IndicatorField::MacdHistogram).unwrap();
        assert_abs_diff_eq!(histogram, macd_line - signal, epsilon = 1e-9);
        assert_eq!(result.value(), Some(macd_line));
    }

    #[test]
    fn required_bars_matches_first_output() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + i as f64).collect();
        let series = OhlcvSeries::from_close(closes.clone())
            .with_high(closes.iter().map(|c| c + 1.0).collect())
            .unwrap()
            .with_low(closes.iter().map(|c| c - 1.0).collect())
            .unwrap()
            .with_volume(vec![1000.0; 40])
            .unwrap();

        let types = [
            IndicatorType::Sma(5),
            IndicatorType::Ema(5),
            IndicatorType::Wma(5),
            IndicatorType::Rsi(5),
            IndicatorType::Roc(5),
            IndicatorType::StdDev(5),
            IndicatorType::Atr(5),
            IndicatorType::Cci(5),
            IndicatorType::WilliamsR(5),
            IndicatorType::Mfi(5),
            IndicatorType::Obv,
            IndicatorType::Macd {
                fast: 3,
                slow: 6,
                signal: 4,
            },
            IndicatorType::Stochastic {
                k_period: 5,
                d_period: 3,
            },
            IndicatorType::Bollinger {
                period: 5,
                deviation: 2.0,
            },
        ];

        for t in types {
            let spec = IndicatorSpec::new(t.clone());
            let needed = t.required_bars();
            let short = calculate(&spec, series.view().prefix(needed - 1)).unwrap();
            assert!(short.values().is_empty(), "{} produced early output", t);
            let enough = calculate(&spec, series.view().prefix(needed)).unwrap();
            assert_eq!(enough.values().len(), 1, "{}", t);

            let all = t.required_bars_all_lines();
            let full = calculate(&spec, series.view().prefix(all)).unwrap();
            for field in [
                IndicatorField::MacdSignal,
                IndicatorField::StochasticD,
                IndicatorField::BollingerLower,
            ] {
                assert!(full.latest(field).is_some(), "{} {:?}", t, field);
            }
        }
    }

    #[test]
    fn bollinger_uses_exact_deviation() {
        let series = OhlcvSeries::from_close(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        // mean 5, population stddev 2
        for (deviation, upper) in [(2.125, 9.25), (0.004, 5.008)] {
            let params = IndicatorParams::new().with("period", 8).with("deviation", deviation);
            let result = calculate_indicator("Bollinger Bands", &series, &params).unwrap();
            assert_abs_diff_eq!(result.latest(IndicatorField::BollingerUpper).unwrap(), upper, epsilon = 1e-12);
            assert_abs_diff_eq!(
                result.latest(IndicatorField::BollingerLower).unwrap(),
                10.0 - upper,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn required_bars_saturates_for_huge_periods() {
        assert_eq!(IndicatorType::Rsi(usize::MAX).required_bars(), usize::MAX);
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: usize::MAX,
            signal: 9,
        };
        assert_eq!(macd.required_bars_all_lines(), usize::MAX - 1);
        let stoch = IndicatorType::Stochastic {
            k_period: usize::MAX,
            d_period: 3,
        };
        assert_eq!(stoch.required_bars_for(IndicatorField::StochasticD), usize::MAX - 1);
    }
}

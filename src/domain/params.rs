//! Indicator parameter sets and alias resolution.
//!
//! Stored strategies spell the same parameter several ways (`period`,
//! `rsiPeriod`, `optInTimePeriod`, ...). Every accepted spelling lives in
//! [`PARAM_TABLE`], ordered by priority, and [`resolve_spec`] is the only
//! place that reads a parameter set.

use crate::domain::error::RulecraftError;
use crate::domain::indicator::{IndicatorName, IndicatorSpec, IndicatorType};
use crate::domain::ohlcv::PriceField;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A raw parameter value as stored: numbers usually, strings often.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, ParamValue::Text(s) if s.trim().is_empty())
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Parameter name → value, exactly as the strategy editor stored it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IndicatorParams(BTreeMap<String, ParamValue>);

impl IndicatorParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tolerant conversion from a JSON object. Nulls are dropped, booleans
    /// and nested values are kept as text.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut params = IndicatorParams::new();
        for (key, v) in object {
            let pv = match v {
                serde_json::Value::Null => continue,
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(f) => ParamValue::Number(f),
                    None => continue,
                },
                serde_json::Value::String(s) => ParamValue::Text(s.clone()),
                other => ParamValue::Text(other.to_string()),
            };
            params.0.insert(key.clone(), pv);
        }
        Some(params)
    }

    /// First alias present (and not blank), in priority order. Exact key
    /// matches win over case-insensitive ones.
    pub fn lookup(&self, aliases: &[&str]) -> Option<(&str, &ParamValue)> {
        let usable = |v: &&ParamValue| !v.is_blank();
        for alias in aliases {
            if let Some((k, v)) = self.0.get_key_value(*alias).filter(|(_, v)| usable(v)) {
                return Some((k.as_str(), v));
            }
        }
        for alias in aliases {
            let found = self
                .0
                .iter()
                .find(|(k, v)| k.eq_ignore_ascii_case(alias) && usable(v));
            if let Some((k, v)) = found {
                return Some((k.as_str(), v));
            }
        }
        None
    }
}

impl<'de> Deserialize<'de> for IndicatorParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(IndicatorParams::new()),
            serde_json::Value::Object(_) => Ok(IndicatorParams::from_json(&value).unwrap_or_default()),
            _ => Err(serde::de::Error::custom("indicator parameters must be an object")),
        }
    }
}

/// One canonical parameter and the spellings that mean it.
#[derive(Debug)]
pub struct ParamSpec {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub default: f64,
}

const fn param(
    canonical: &'static str,
    aliases: &'static [&'static str],
    default: f64,
) -> ParamSpec {
    ParamSpec {
        canonical,
        aliases,
        default,
    }
}

/// Largest accepted period. Longer windows cannot be filled by any real
/// series and would overflow history arithmetic.
pub const MAX_PERIOD: usize = u32::MAX as usize;

const SOURCE_ALIASES: &[&str] = &["source", "priceSource", "optInSource", "applyTo"];

/// indicator → canonical parameter → aliases in priority order.
pub static PARAM_TABLE: &[(IndicatorName, &[ParamSpec])] = &[
    (
        IndicatorName::Sma,
        &[param("period", &["period", "smaPeriod", "timePeriod", "optInTimePeriod", "length"], 20.0)],
    ),
    (
        IndicatorName::Ema,
        &[param("period", &["period", "emaPeriod", "timePeriod", "optInTimePeriod", "length"], 20.0)],
    ),
    (
        IndicatorName::Wma,
        &[param("period", &["period", "wmaPeriod", "timePeriod", "optInTimePeriod", "length"], 20.0)],
    ),
    (
        IndicatorName::Rsi,
        &[param("period", &["period", "rsiPeriod", "optInTimePeriod", "length"], 14.0)],
    ),
    (
        IndicatorName::Roc,
        &[param("period", &["period", "rocPeriod", "optInTimePeriod", "length"], 12.0)],
    ),
    (
        IndicatorName::StdDev,
        &[param("period", &["period", "stdDevPeriod", "optInTimePeriod", "length"], 20.0)],
    ),
    (
        IndicatorName::Atr,
        &[param("period", &["period", "atrPeriod", "optInTimePeriod", "length"], 14.0)],
    ),
    (
        IndicatorName::Cci,
        &[param("period", &["period", "cciPeriod", "optInTimePeriod", "length"], 14.0)],
    ),
    (
        IndicatorName::WilliamsR,
        &[param("period", &["period", "williamsPeriod", "willrPeriod", "optInTimePeriod", "length"], 14.0)],
    ),
    (
        IndicatorName::Mfi,
        &[param("period", &["period", "mfiPeriod", "optInTimePeriod", "length"], 14.0)],
    ),
    (
        IndicatorName::BollingerBands,
        &[
            param("period", &["period", "bbPeriod", "optInTimePeriod", "length"], 20.0),
            param("deviation", &["deviation", "stdDev", "stddev", "multiplier", "optInNbDevUp", "optInNbDev"], 2.0),
        ],
    ),
    (
        IndicatorName::Macd,
        &[
            param("fast", &["fast", "fastPeriod", "optInFastPeriod", "fastLength"], 12.0),
            param("slow", &["slow", "slowPeriod", "optInSlowPeriod", "slowLength"], 26.0),
            param("signal", &["signal", "signalPeriod", "optInSignalPeriod", "signalLength"], 9.0),
        ],
    ),
    (
        IndicatorName::Stochastic,
        &[
            param("kPeriod", &["kPeriod", "k", "fastKPeriod", "optInFastK_Period", "period"], 14.0),
            param("dPeriod", &["dPeriod", "d", "slowDPeriod", "optInSlowD_Period", "signal"], 3.0),
        ],
    ),
    (IndicatorName::Obv, &[]),
];

pub fn param_specs(name: IndicatorName) -> &'static [ParamSpec] {
    PARAM_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, specs)| *specs)
        .unwrap_or(&[])
}

/// Indicators computed over a single price column accept `source`.
pub fn accepts_source(name: IndicatorName) -> bool {
    matches!(
        name,
        IndicatorName::Sma
            | IndicatorName::Ema
            | IndicatorName::Wma
            | IndicatorName::Rsi
            | IndicatorName::Roc
            | IndicatorName::StdDev
            | IndicatorName::BollingerBands
            | IndicatorName::Macd
    )
}

struct Resolver<'a> {
    name: IndicatorName,
    params: &'a IndicatorParams,
}

impl Resolver<'_> {
    fn spec(&self, canonical: &str) -> Result<&'static ParamSpec, RulecraftError> {
        param_specs(self.name)
            .iter()
            .find(|p| p.canonical == canonical)
            .ok_or_else(|| self.invalid(canonical, "parameter not recognised".into()))
    }

    fn number(&self, canonical: &str) -> Result<f64, RulecraftError> {
        let spec = self.spec(canonical)?;
        match self.params.lookup(spec.aliases) {
            None => Ok(spec.default),
            Some((key, value)) => match value.as_f64() {
                Some(n) if n.is_finite() && n > 0.0 => Ok(n),
                Some(n) => Err(self.invalid(key, format!("must be positive, got {}", n))),
                None => Err(self.invalid(key, format!("'{}' is not a number", value))),
            },
        }
    }

    fn period(&self, canonical: &str) -> Result<usize, RulecraftError> {
        let n = self.number(canonical)?;
        if n.fract() != 0.0 {
            return Err(self.invalid(canonical, format!("must be a whole number, got {}", n)));
        }
        if n > MAX_PERIOD as f64 {
            return Err(self.invalid(canonical, format!("must be at most {}, got {}", MAX_PERIOD, n)));
        }
        Ok(n as usize)
    }

    fn source(&self) -> Result<PriceField, RulecraftError> {
        if !accepts_source(self.name) {
            return Ok(PriceField::Close);
        }
        match self.params.lookup(SOURCE_ALIASES) {
            None => Ok(PriceField::Close),
            Some((key, value)) => value
                .to_string()
                .parse::<PriceField>()
                .map_err(|reason| self.invalid(key, reason)),
        }
    }

    fn invalid(&self, key: &str, reason: String) -> RulecraftError {
        RulecraftError::InvalidParameter {
            indicator: self.name.to_string(),
            key: key.to_string(),
            reason,
        }
    }
}

/// Resolve a raw parameter set into a concrete indicator configuration,
/// filling defaults for anything missing.
pub fn resolve_spec(
    name: IndicatorName,
    params: &IndicatorParams,
) -> Result<IndicatorSpec, RulecraftError> {
    let r = Resolver { name, params };
    let indicator_type = match name {
        IndicatorName::Sma => IndicatorType::Sma(r.period("period")?),
        IndicatorName::Ema => IndicatorType::Ema(r.period("period")?),
        IndicatorName::Wma => IndicatorType::Wma(r.period("period")?),
        IndicatorName::Rsi => IndicatorType::Rsi(r.period("period")?),
        IndicatorName::Roc => IndicatorType::Roc(r.period("period")?),
        IndicatorName::StdDev => IndicatorType::StdDev(r.period("period")?),
        IndicatorName::Atr => IndicatorType::Atr(r.period("period")?),
        IndicatorName::Cci => IndicatorType::Cci(r.period("period")?),
        IndicatorName::WilliamsR => IndicatorType::WilliamsR(r.period("period")?),
        IndicatorName::Mfi => IndicatorType::Mfi(r.period("period")?),
        IndicatorName::Obv => IndicatorType::Obv,
        IndicatorName::BollingerBands => IndicatorType::Bollinger {
            period: r.period("period")?,
            deviation: r.number("deviation")?,
        },
        IndicatorName::Macd => IndicatorType::Macd {
            fast: r.period("fast")?,
            slow: r.period("slow")?,
            signal: r.period("signal")?,
        },
        IndicatorName::Stochastic => IndicatorType::Stochastic {
            k_period: r.period("kPeriod")?,
            d_period: r.period("dPeriod")?,
        },
    };

    Ok(IndicatorSpec {
        indicator_type,
        source: r.source()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let empty = IndicatorParams::new();
        let cases = [
            (IndicatorName::Rsi, IndicatorType::Rsi(14)),
            (IndicatorName::Atr, IndicatorType::Atr(14)),
            (IndicatorName::Cci, IndicatorType::Cci(14)),
            (IndicatorName::Mfi, IndicatorType::Mfi(14)),
            (IndicatorName::WilliamsR, IndicatorType::WilliamsR(14)),
            (
                IndicatorName::BollingerBands,
                IndicatorType::Bollinger {
                    period: 20,
                    deviation: 2.0,
                },
            ),
            (
                IndicatorName::Macd,
                IndicatorType::Macd {
                    fast: 12,
                    slow: 26,
                    signal: 9,
                },
            ),
            (
                IndicatorName::Stochastic,
                IndicatorType::Stochastic {
                    k_period: 14,
                    d_period: 3,
                },
            ),
        ];
        for (name, expected) in cases {
            let spec = resolve_spec(name, &empty).unwrap();
            assert_eq!(spec.indicator_type, expected, "{}", name);
            assert_eq!(spec.source, PriceField::Close);
        }
    }

    #[test]
    fn alias_priority_order() {
        let params = IndicatorParams::new()
            .with("optInTimePeriod", 21)
            .with("rsiPeriod", 7);
        let spec = resolve_spec(IndicatorName::Rsi, &params).unwrap();
        assert_eq!(spec.indicator_type, IndicatorType::Rsi(7));

        let params = params.with("period", "9");
        let spec = resolve_spec(IndicatorName::Rsi, &params).unwrap();
        assert_eq!(spec.indicator_type, IndicatorType::Rsi(9));
    }

    #[test]
    fn alias_case_insensitive_fallback() {
        let params = IndicatorParams::new().with("KPeriod", 5).with("DPERIOD", 2);
        let spec = resolve_spec(IndicatorName::Stochastic, &params).unwrap();
        assert_eq!(
            spec.indicator_type,
            IndicatorType::Stochastic {
                k_period: 5,
                d_period: 2
            }
        );
    }

    #[test]
    fn blank_values_fall_back_to_default() {
        let params = IndicatorParams::new().with("period", "  ");
        let spec = resolve_spec(IndicatorName::Cci, &params).unwrap();
        assert_eq!(spec.indicator_type, IndicatorType::Cci(14));
    }

    #[test]
    fn string_numbers_and_deviation() {
        let params = IndicatorParams::new()
            .with("period", "10")
            .with("stdDev", "2.5");
        let spec = resolve_spec(IndicatorName::BollingerBands, &params).unwrap();
        assert_eq!(
            spec.indicator_type,
            IndicatorType::Bollinger {
                period: 10,
                deviation: 2.5
            }
        );
    }

    #[test]
    fn invalid_values_are_errors() {
        let params = IndicatorParams::new().with("period", "abc");
        let err = resolve_spec(IndicatorName::Sma, &params).unwrap_err();
        assert!(matches!(err, RulecraftError::InvalidParameter { ref key, .. } if key == "period"));

        let params = IndicatorParams::new().with("fastPeriod", 0);
        assert!(resolve_spec(IndicatorName::Macd, &params).is_err());

        let params = IndicatorParams::new().with("period", 2.5);
        assert!(resolve_spec(IndicatorName::Ema, &params).is_err());
    }

    #[test]
    fn deviation_kept_exactly() {
        let params = IndicatorParams::new().with("deviation", 2.125);
        let spec = resolve_spec(IndicatorName::BollingerBands, &params).unwrap();
        assert_eq!(
            spec.indicator_type,
            IndicatorType::Bollinger {
                period: 20,
                deviation: 2.125
            }
        );

        let params = IndicatorParams::new().with("multiplier", "0.004");
        let spec = resolve_spec(IndicatorName::BollingerBands, &params).unwrap();
        assert!(matches!(
            spec.indicator_type,
            IndicatorType::Bollinger { deviation, .. } if deviation == 0.004
        ));
    }

    #[test]
    fn oversized_periods_are_rejected() {
        let params = IndicatorParams::new().with("period", "1e30");
        let err = resolve_spec(IndicatorName::Rsi, &params).unwrap_err();
        assert!(matches!(err, RulecraftError::InvalidParameter { ref key, .. } if key == "period"));

        let params = IndicatorParams::new().with("signal", 1e12);
        assert!(resolve_spec(IndicatorName::Macd, &params).is_err());

        let params = IndicatorParams::new().with("kPeriod", MAX_PERIOD);
        assert!(resolve_spec(IndicatorName::Stochastic, &params).is_ok());
    }

    #[test]
    fn source_only_for_single_series_indicators() {
        let params = IndicatorParams::new().with("source", "High");
        let spec = resolve_spec(IndicatorName::Sma, &params).unwrap();
        assert_eq!(spec.source, PriceField::High);

        let spec = resolve_spec(IndicatorName::Atr, &params).unwrap();
        assert_eq!(spec.source, PriceField::Close);

        let params = IndicatorParams::new().with("source", "hl2");
        assert!(resolve_spec(IndicatorName::Ema, &params).is_err());
    }

    #[test]
    fn every_indicator_has_a_table_entry() {
        for name in IndicatorName::ALL {
            assert!(
                PARAM_TABLE.iter().any(|(n, _)| n == name),
                "{} missing from PARAM_TABLE",
                name
            );
        }
    }

    #[test]
    fn json_params_tolerated() {
        let value = serde_json::json!({"period": "14", "fast": 12, "flag": true, "gone": null});
        let params: IndicatorParams = serde_json::from_value(value).unwrap();
        assert_eq!(params.get("period"), Some(&ParamValue::Text("14".into())));
        assert_eq!(params.get("fast"), Some(&ParamValue::Number(12.0)));
        assert_eq!(params.get("flag"), Some(&ParamValue::Text("true".into())));
        assert!(params.get("gone").is_none());

        let params: IndicatorParams = serde_json::from_str("null").unwrap();
        assert!(params.is_empty());
    }
}

//! Rule data structures.
//!
//! - `Operand`: what can be compared (indicator line, price field, literal)
//! - `Inequality`: one comparison; operands and condition stay optional so a
//!   half-configured rule can still be loaded and reported as incomplete
//! - `RuleGroup`: AND/OR fold over inequalities with a required count
//!
//! Stored documents are read tolerantly: unknown operand types, unknown
//! conditions and non-numeric literals become missing parts, not errors.

use crate::domain::error::RulecraftError;
use crate::domain::indicator::{IndicatorField, IndicatorName, IndicatorSpec};
use crate::domain::ohlcv::PriceField;
use crate::domain::params::{resolve_spec, IndicatorParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    GreaterThan,
    LessThan,
    Equal,
    GreaterThanOrEqual,
    LessThanOrEqual,
    CrossesAbove,
    CrossesBelow,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::GreaterThan => "GREATER_THAN",
            Condition::LessThan => "LESS_THAN",
            Condition::Equal => "EQUAL",
            Condition::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Condition::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Condition::CrossesAbove => "CROSSES_ABOVE",
            Condition::CrossesBelow => "CROSSES_BELOW",
        }
    }

    pub fn is_crossing(&self) -> bool {
        matches!(self, Condition::CrossesAbove | Condition::CrossesBelow)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = String;

    /// Accepts the stored names in any case with `_`, `-` or spaces, plus
    /// the usual comparison symbols.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_uppercase)
            .collect();
        match key.as_str() {
            "GREATERTHAN" | "GT" | ">" => Ok(Condition::GreaterThan),
            "LESSTHAN" | "LT" | "<" => Ok(Condition::LessThan),
            "EQUAL" | "EQUALS" | "EQ" | "=" | "==" => Ok(Condition::Equal),
            "GREATERTHANOREQUAL" | "GTE" | "GE" | ">=" => Ok(Condition::GreaterThanOrEqual),
            "LESSTHANOREQUAL" | "LTE" | "LE" | "<=" => Ok(Condition::LessThanOrEqual),
            "CROSSESABOVE" | "CROSSABOVE" => Ok(Condition::CrossesAbove),
            "CROSSESBELOW" | "CROSSBELOW" => Ok(Condition::CrossesBelow),
            _ => Err(format!("unknown condition '{}'", s.trim())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::And => f.write_str("AND"),
            Logic::Or => f.write_str("OR"),
        }
    }
}

impl FromStr for Logic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AND" | "ALL" => Ok(Logic::And),
            "OR" | "ANY" => Ok(Logic::Or),
            other => Err(format!("unknown logic '{}'", other)),
        }
    }
}

/// Reference to one line of an indicator, as the rule stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRef {
    pub name: String,
    pub parameters: IndicatorParams,
    pub value_type: Option<String>,
}

impl IndicatorRef {
    pub fn new(name: &str, parameters: IndicatorParams) -> Self {
        Self {
            name: name.to_string(),
            parameters,
            value_type: None,
        }
    }

    pub fn with_value_type(mut self, value_type: &str) -> Self {
        self.value_type = Some(value_type.to_string());
        self
    }

    /// Resolve name and parameters, and pick the requested line.
    pub fn resolve(&self) -> Result<(IndicatorSpec, IndicatorField), RulecraftError> {
        let name: IndicatorName = self.name.parse()?;
        let spec = resolve_spec(name, &self.parameters)?;
        let field = IndicatorField::from_value_type(name, self.value_type.as_deref());
        Ok((spec, field))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Indicator(IndicatorRef),
    Price(PriceField),
    Value(f64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Indicator(r) => match &r.value_type {
                Some(vt) => write!(f, "{} ({})", r.name, vt),
                None => f.write_str(&r.name),
            },
            Operand::Price(field) => write!(f, "price.{}", field),
            Operand::Value(v) => write!(f, "{}", v),
        }
    }
}

impl Operand {
    pub fn required_bars(&self) -> Result<usize, RulecraftError> {
        match self {
            Operand::Indicator(r) => {
                let (spec, field) = r.resolve()?;
                Ok(spec.indicator_type.required_bars_for(field))
            }
            Operand::Price(_) => Ok(1),
            Operand::Value(_) => Ok(0),
        }
    }

    /// Build an operand from the loose parts a stored rule carries.
    /// Returns `None` when the parts do not describe a usable operand.
    pub fn from_parts(
        kind: Option<&str>,
        indicator: Option<&str>,
        parameters: IndicatorParams,
        value_type: Option<&str>,
        value: Option<&serde_json::Value>,
    ) -> Option<Operand> {
        let kind = kind?.trim().to_uppercase();
        match kind.as_str() {
            "INDICATOR" => {
                let name = indicator.map(str::trim).filter(|n| !n.is_empty())?;
                let value_type = value_type
                    .map(str::trim)
                    .filter(|vt| !vt.is_empty())
                    .map(str::to_string);
                Some(Operand::Indicator(IndicatorRef {
                    name: name.to_string(),
                    parameters,
                    value_type,
                }))
            }
            "PRICE" => match value.and_then(literal_text) {
                None => Some(Operand::Price(PriceField::Close)),
                Some(text) if text.trim().is_empty() => Some(Operand::Price(PriceField::Close)),
                Some(text) => text.parse().ok().map(Operand::Price),
            },
            "VALUE" => value.and_then(literal_number).map(Operand::Value),
            _ => None,
        }
    }
}

fn literal_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn literal_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// One comparison between two operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawInequality", into = "RawInequality")]
pub struct Inequality {
    pub id: String,
    pub left: Option<Operand>,
    pub condition: Option<Condition>,
    pub right: Option<Operand>,
    pub explanation: Option<String>,
}

impl Inequality {
    pub fn new(id: &str, left: Operand, condition: Condition, right: Operand) -> Self {
        Self {
            id: id.to_string(),
            left: Some(left),
            condition: Some(condition),
            right: Some(right),
            explanation: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.left.is_some() && self.condition.is_some() && self.right.is_some()
    }

    /// Bars needed before this inequality has a value on both sides,
    /// one more for crossings. Incomplete inequalities need none.
    pub fn required_bars(&self) -> Result<usize, RulecraftError> {
        let (Some(left), Some(condition), Some(right)) = (&self.left, self.condition, &self.right)
        else {
            return Ok(0);
        };
        let bars = left.required_bars()?.max(right.required_bars()?).max(1);
        Ok(if condition.is_crossing() { bars.saturating_add(1) } else { bars })
    }

    /// Every indicator this inequality reads.
    pub fn indicators(&self) -> impl Iterator<Item = &IndicatorRef> {
        [self.left.as_ref(), self.right.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(|op| match op {
                Operand::Indicator(r) => Some(r),
                _ => None,
            })
    }
}

impl fmt::Display for Inequality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |op: &Option<Operand>| match op {
            Some(op) => op.to_string(),
            None => "?".to_string(),
        };
        let condition = self.condition.map(|c| c.as_str()).unwrap_or("?");
        write!(f, "{} {} {}", part(&self.left), condition, part(&self.right))
    }
}

/// An operand as stored in a strategy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawOperand {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    #[serde(default, skip_serializing_if = "IndicatorParams::is_empty")]
    pub parameters: IndicatorParams,
    #[serde(default, alias = "value_type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl RawOperand {
    fn into_operand(self) -> Option<Operand> {
        Operand::from_parts(
            self.kind.as_deref(),
            self.indicator.as_deref(),
            self.parameters,
            self.value_type.as_deref(),
            self.value.as_ref(),
        )
    }
}

impl From<Operand> for RawOperand {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Indicator(r) => RawOperand {
                kind: Some("INDICATOR".into()),
                indicator: Some(r.name),
                parameters: r.parameters,
                value_type: r.value_type,
                value: None,
            },
            Operand::Price(field) => RawOperand {
                kind: Some("PRICE".into()),
                value: Some(serde_json::Value::String(field.as_str().into())),
                ..RawOperand::default()
            },
            Operand::Value(v) => RawOperand {
                kind: Some("VALUE".into()),
                value: serde_json::Number::from_f64(v).map(serde_json::Value::Number),
                ..RawOperand::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInequality {
    #[serde(default, deserialize_with = "de_id")]
    id: String,
    #[serde(default)]
    left: Option<RawOperand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
    #[serde(default)]
    right: Option<RawOperand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl From<RawInequality> for Inequality {
    fn from(raw: RawInequality) -> Self {
        Inequality {
            id: raw.id,
            left: raw.left.and_then(RawOperand::into_operand),
            condition: raw.condition.and_then(|c| c.parse().ok()),
            right: raw.right.and_then(RawOperand::into_operand),
            explanation: raw.explanation.filter(|e| !e.trim().is_empty()),
        }
    }
}

impl From<Inequality> for RawInequality {
    fn from(ineq: Inequality) -> Self {
        RawInequality {
            id: ineq.id,
            left: ineq.left.map(RawOperand::from),
            condition: ineq.condition.map(|c| c.as_str().to_string()),
            right: ineq.right.map(RawOperand::from),
            explanation: ineq.explanation,
        }
    }
}

/// Ids arrive as strings or integers depending on the store.
pub(crate) fn de_id<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// AND/OR group of inequalities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRuleGroup", into = "RawRuleGroup")]
pub struct RuleGroup {
    pub id: String,
    pub logic: Logic,
    pub inequalities: Vec<Inequality>,
    required_conditions: usize,
}

impl RuleGroup {
    /// `required_conditions` defaults to 1 and is clamped to
    /// `[1, inequalities.len()]`.
    pub fn new(
        id: &str,
        logic: Logic,
        inequalities: Vec<Inequality>,
        required_conditions: Option<i64>,
    ) -> Self {
        let required_conditions = clamp_required(required_conditions, inequalities.len());
        Self {
            id: id.to_string(),
            logic,
            inequalities,
            required_conditions,
        }
    }

    pub fn and(id: &str, inequalities: Vec<Inequality>) -> Self {
        Self::new(id, Logic::And, inequalities, None)
    }

    pub fn or(id: &str, inequalities: Vec<Inequality>, required: usize) -> Self {
        Self::new(id, Logic::Or, inequalities, Some(required as i64))
    }

    /// Number of true inequalities an OR group needs.
    pub fn required_conditions(&self) -> usize {
        self.required_conditions
    }

    pub fn is_empty(&self) -> bool {
        self.inequalities.is_empty()
    }
}

pub(crate) fn clamp_required(requested: Option<i64>, len: usize) -> usize {
    let upper = len.max(1) as i64;
    requested.unwrap_or(1).clamp(1, upper) as usize
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRuleGroup {
    #[serde(default, deserialize_with = "de_id")]
    id: String,
    #[serde(default)]
    logic: Option<String>,
    #[serde(default)]
    inequalities: Vec<Inequality>,
    #[serde(default, alias = "required_conditions")]
    required_conditions: Option<i64>,
}

impl From<RawRuleGroup> for RuleGroup {
    fn from(raw: RawRuleGroup) -> Self {
        let logic = raw
            .logic
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or_default();
        RuleGroup::new(&raw.id, logic, raw.inequalities, raw.required_conditions)
    }
}

impl From<RuleGroup> for RawRuleGroup {
    fn from(group: RuleGroup) -> Self {
        RawRuleGroup {
            id: group.id,
            logic: Some(group.logic.to_string()),
            required_conditions: Some(group.required_conditions as i64),
            inequalities: group.inequalities,
        }
    }
}

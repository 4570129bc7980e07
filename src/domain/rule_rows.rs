//! Persisted rule rows.
//!
//! Strategies stored relationally arrive as two flat tables: `rule_groups`
//! (one row per group, tagged entry or exit) and `trading_rules` (one row
//! per inequality, pointing at its group). [`assemble_strategy_rules`]
//! rebuilds the typed group tree from those rows.

use crate::domain::params::IndicatorParams;
use crate::domain::rule::{de_id, Inequality, Logic, Operand, RuleGroup};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleGroupRow {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "strategyId", skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<serde_json::Value>,
    #[serde(default, alias = "ruleType")]
    pub rule_type: String,
    #[serde(default)]
    pub logic: Option<String>,
    #[serde(default, alias = "requiredConditions")]
    pub required_conditions: Option<i64>,
    #[serde(default, alias = "groupOrder")]
    pub group_order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InequalityRow {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "ruleGroupId", deserialize_with = "de_id")]
    pub rule_group_id: String,

    #[serde(default, alias = "leftType")]
    pub left_type: Option<String>,
    #[serde(default, alias = "leftIndicator")]
    pub left_indicator: Option<String>,
    /// JSON object, or a string holding one.
    #[serde(default, alias = "leftParameters")]
    pub left_parameters: Option<serde_json::Value>,
    #[serde(default, alias = "leftValue")]
    pub left_value: Option<serde_json::Value>,
    #[serde(default, alias = "leftValueType")]
    pub left_value_type: Option<String>,

    #[serde(default)]
    pub condition: Option<String>,

    #[serde(default, alias = "rightType")]
    pub right_type: Option<String>,
    #[serde(default, alias = "rightIndicator")]
    pub right_indicator: Option<String>,
    #[serde(default, alias = "rightParameters")]
    pub right_parameters: Option<serde_json::Value>,
    #[serde(default, alias = "rightValue")]
    pub right_value: Option<serde_json::Value>,
    #[serde(default, alias = "rightValueType")]
    pub right_value_type: Option<String>,

    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default, alias = "inequalityOrder")]
    pub inequality_order: Option<i64>,
}

/// Entry and exit groups rebuilt from rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledRules {
    pub entry_rules: Vec<RuleGroup>,
    pub exit_rules: Vec<RuleGroup>,
}

impl InequalityRow {
    pub fn to_inequality(&self) -> Inequality {
        let left = Operand::from_parts(
            self.left_type.as_deref(),
            self.left_indicator.as_deref(),
            row_params(&self.id, self.left_parameters.as_ref()),
            self.left_value_type.as_deref(),
            self.left_value.as_ref(),
        );
        let right = Operand::from_parts(
            self.right_type.as_deref(),
            self.right_indicator.as_deref(),
            row_params(&self.id, self.right_parameters.as_ref()),
            self.right_value_type.as_deref(),
            self.right_value.as_ref(),
        );
        Inequality {
            id: self.id.clone(),
            left,
            condition: self.condition.as_deref().and_then(|c| c.parse().ok()),
            right,
            explanation: self
                .explanation
                .clone()
                .filter(|e| !e.trim().is_empty()),
        }
    }
}

fn row_params(row_id: &str, raw: Option<&serde_json::Value>) -> IndicatorParams {
    let parsed = match raw {
        None | Some(serde_json::Value::Null) => return IndicatorParams::new(),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
            return IndicatorParams::new();
        }
        Some(serde_json::Value::String(s)) => serde_json::from_str::<serde_json::Value>(s)
            .ok()
            .and_then(|v| IndicatorParams::from_json(&v)),
        Some(other) => IndicatorParams::from_json(other),
    };
    parsed.unwrap_or_else(|| {
        warn!(row = row_id, "ignoring unreadable indicator parameters");
        IndicatorParams::new()
    })
}

/// Orders by the explicit order column; rows without one keep their input
/// order after every ordered row.
fn order_key(order: Option<i64>) -> (bool, i64) {
    (order.is_none(), order.unwrap_or(0))
}

/// Group `rows` under `groups` and split the result into entry and exit
/// rules. Rows pointing at an unknown group, and groups with an unknown
/// `rule_type`, are dropped with a warning.
pub fn assemble_strategy_rules(groups: &[RuleGroupRow], rows: &[InequalityRow]) -> AssembledRules {
    let mut by_group: HashMap<&str, Vec<&InequalityRow>> = HashMap::new();
    for row in rows {
        by_group.entry(row.rule_group_id.as_str()).or_default().push(row);
    }

    let mut ordered_groups: Vec<&RuleGroupRow> = groups.iter().collect();
    ordered_groups.sort_by_key(|g| order_key(g.group_order));

    let mut assembled = AssembledRules::default();
    for group in ordered_groups {
        let mut members = by_group.remove(group.id.as_str()).unwrap_or_default();
        members.sort_by_key(|r| order_key(r.inequality_order));

        let logic = group
            .logic
            .as_deref()
            .and_then(|l| l.parse::<Logic>().ok())
            .unwrap_or_default();
        let inequalities = members.iter().map(|r| r.to_inequality()).collect();
        let rule_group = RuleGroup::new(&group.id, logic, inequalities, group.required_conditions);

        match group.rule_type.trim().to_lowercase().as_str() {
            "entry" => assembled.entry_rules.push(rule_group),
            "exit" => assembled.exit_rules.push(rule_group),
            other => warn!(
                group = %group.id,
                rule_type = other,
                "dropping rule group with unknown rule type"
            ),
        }
    }

    let mut orphans: Vec<&str> = by_group.into_keys().collect();
    orphans.sort_unstable();
    for group_id in orphans {
        warn!(group = group_id, "dropping rules that reference an unknown group");
    }

    assembled
}

//! JSON strategy file adapter.
//!
//! Two layouts are accepted:
//!
//! - nested: `{"name", "entryRules": [group...], "exitRules": [group...]}`
//! - rows: `{"name", "ruleGroups": [row...], "tradingRules": [row...]}`,
//!   the shape a relational store exports

use crate::domain::error::RulecraftError;
use crate::domain::rule::de_id;
use crate::domain::rule_rows::{assemble_strategy_rules, InequalityRow, RuleGroupRow};
use crate::domain::strategy::Strategy;
use crate::ports::strategy_port::StrategyPort;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default)]
pub struct JsonStrategyAdapter;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowDocument {
    #[serde(default, deserialize_with = "de_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(alias = "rule_groups")]
    rule_groups: Vec<RuleGroupRow>,
    #[serde(default, alias = "trading_rules")]
    trading_rules: Vec<InequalityRow>,
}

impl JsonStrategyAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Parse a strategy document held in memory. `source_name` labels
    /// errors.
    pub fn parse_str(content: &str, source_name: &str) -> Result<Strategy, RulecraftError> {
        let parse_error = |e: serde_json::Error| RulecraftError::StrategyParse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        };

        let value: serde_json::Value = serde_json::from_str(content).map_err(parse_error)?;
        if !value.is_object() {
            return Err(RulecraftError::StrategyParse {
                source_name: source_name.to_string(),
                reason: "expected a JSON object".to_string(),
            });
        }

        let is_rows = value.get("ruleGroups").is_some() || value.get("rule_groups").is_some();
        let strategy = if is_rows {
            let doc: RowDocument = serde_json::from_value(value).map_err(parse_error)?;
            let rules = assemble_strategy_rules(&doc.rule_groups, &doc.trading_rules);
            Strategy {
                id: doc.id,
                name: doc.name,
                description: doc.description,
                entry_rules: rules.entry_rules,
                exit_rules: rules.exit_rules,
            }
        } else {
            serde_json::from_value(value).map_err(parse_error)?
        };

        debug!(
            source = source_name,
            name = %strategy.name,
            layout = if is_rows { "rows" } else { "nested" },
            entry_groups = strategy.entry_rules.len(),
            exit_groups = strategy.exit_rules.len(),
            "strategy loaded"
        );
        Ok(strategy)
    }
}

impl StrategyPort for JsonStrategyAdapter {
    fn load_strategy(&self, path: &Path) -> Result<Strategy, RulecraftError> {
        let content = fs::read_to_string(path).map_err(|e| RulecraftError::StrategyParse {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse_str(&content, &path.display().to_string())
    }
}

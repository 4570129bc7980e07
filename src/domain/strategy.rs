//! Strategy rule sets.

use crate::domain::error::RulecraftError;
use crate::domain::rule::{de_id, IndicatorRef, Inequality, RuleGroup};
use serde::{Deserialize, Serialize};

/// Entry and exit rule groups. Either side may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "entry_rules")]
    pub entry_rules: Vec<RuleGroup>,
    #[serde(default, alias = "exit_rules")]
    pub exit_rules: Vec<RuleGroup>,
}

/// Result of a static check over a strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyReport {
    pub entry_groups: usize,
    pub exit_groups: usize,
    pub inequalities: usize,
    /// `(group id, inequality)` for every inequality that is not complete.
    pub incomplete: Vec<(String, String)>,
    /// Bars needed before every complete inequality can be evaluated.
    pub required_bars: usize,
}

impl Strategy {
    pub fn new(name: &str, entry_rules: Vec<RuleGroup>, exit_rules: Vec<RuleGroup>) -> Self {
        Self {
            name: name.to_string(),
            entry_rules,
            exit_rules,
            ..Self::default()
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = &RuleGroup> {
        self.entry_rules.iter().chain(&self.exit_rules)
    }

    pub fn inequalities(&self) -> impl Iterator<Item = &Inequality> {
        self.groups().flat_map(|g| g.inequalities.iter())
    }

    pub fn indicator_refs(&self) -> impl Iterator<Item = &IndicatorRef> {
        self.inequalities().flat_map(Inequality::indicators)
    }

    /// History needed before every complete inequality can be evaluated.
    pub fn required_bars(&self) -> Result<usize, RulecraftError> {
        self.inequalities()
            .map(Inequality::required_bars)
            .try_fold(0, |acc, bars| Ok(acc.max(bars?)))
    }

    /// Resolve every indicator reference and list incomplete inequalities.
    /// Unsupported names and invalid parameters are errors.
    pub fn check(&self) -> Result<StrategyReport, RulecraftError> {
        for indicator in self.indicator_refs() {
            indicator.resolve()?;
        }
        let incomplete = self
            .groups()
            .flat_map(|g| {
                g.inequalities
                    .iter()
                    .filter(|i| !i.is_complete())
                    .map(move |i| (g.id.clone(), format!("{} ({})", i.id, i)))
            })
            .collect();
        Ok(StrategyReport {
            entry_groups: self.entry_rules.len(),
            exit_groups: self.exit_rules.len(),
            inequalities: self.inequalities().count(),
            incomplete,
            required_bars: self.required_bars()?,
        })
    }
}

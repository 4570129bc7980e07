//! Rule evaluation engine.
//!
//! Evaluates inequalities, rule groups and strategies against the bars in a
//! `MarketContext`. Only the last bar (and the one before it, for crossings)
//! is ever compared; indicators are computed from the full supplied history,
//! or read from `PrecomputedIndicators` when the context carries them.
//!
//! # Evaluation Semantics
//!
//! - Comparisons use the latest resolved value of each operand
//! - `EQUAL` (and the equality half of `>=`/`<=`) uses a 1e-9 tolerance
//! - `CROSSES_ABOVE`: previous `left <= right` and current `left > right`
//! - `CROSSES_BELOW`: previous `left >= right` and current `left < right`
//! - Incomplete inequalities are not met; they never raise
//! - AND: every inequality true (vacuously true when empty)
//! - OR: at least `required_conditions` inequalities true (false when empty)
//! - Entry and exit sides are evaluated separately; neither reads the other

use crate::domain::error::RulecraftError;
use crate::domain::indicator::{calculate, IndicatorField, IndicatorResult, IndicatorSpec};
use crate::domain::ohlcv::{OhlcvSeries, OhlcvView};
use crate::domain::rule::{Condition, Inequality, Logic, Operand, RuleGroup};
use crate::domain::signal::{Precedence, SignalAction};
use crate::domain::strategy::Strategy;
use serde::Serialize;
use tracing::{debug, warn};

const EPSILON: f64 = 1e-9;

/// Indicator results computed once over a whole series.
///
/// Every line is causal and end-aligned, so the value a prefix of the series
/// would produce at bar `i` is the full line's value at bar `i`.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedIndicators {
    bars: usize,
    results: Vec<IndicatorResult>,
}

impl PrecomputedIndicators {
    /// Each distinct indicator read by a complete inequality of `strategy`.
    /// References that fail to resolve or compute are left out; evaluating
    /// them reports the error at the bar.
    pub fn for_strategy(strategy: &Strategy, view: OhlcvView<'_>) -> Self {
        let mut results: Vec<IndicatorResult> = Vec::new();
        let refs = strategy
            .inequalities()
            .filter(|i| i.is_complete())
            .flat_map(Inequality::indicators);
        for indicator in refs {
            let Ok((spec, _)) = indicator.resolve() else {
                continue;
            };
            if results.iter().any(|r| r.spec == spec) {
                continue;
            }
            if let Ok(result) = calculate(&spec, view) {
                results.push(result);
            }
        }
        debug!(bars = view.len(), indicators = results.len(), "indicators precomputed");
        Self {
            bars: view.len(),
            results,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn get(&self, spec: &IndicatorSpec) -> Option<&IndicatorResult> {
        self.results.iter().find(|r| &r.spec == spec)
    }
}

/// Market data an evaluation runs against: bars up to and including "now".
#[derive(Debug, Clone, Copy)]
pub struct MarketContext<'a> {
    view: OhlcvView<'a>,
    indicators: Option<&'a PrecomputedIndicators>,
}

impl<'a> MarketContext<'a> {
    pub fn new(view: OhlcvView<'a>) -> Self {
        Self {
            view,
            indicators: None,
        }
    }

    /// Read indicators from `indicators`, which must have been computed over
    /// the series this context's view is a prefix of.
    pub fn with_indicators(mut self, indicators: &'a PrecomputedIndicators) -> Self {
        self.indicators = Some(indicators);
        self
    }

    pub fn bars(&self) -> usize {
        self.view.len()
    }

    pub fn view(&self) -> OhlcvView<'a> {
        self.view
    }

    fn precomputed_tail(&self, spec: &IndicatorSpec, field: IndicatorField) -> Option<Tail> {
        let set = self.indicators.filter(|set| self.bars() <= set.bars)?;
        set.get(spec)
            .map(|result| Tail::at(result.line(field), set.bars, self.bars()))
    }
}

impl<'a> From<&'a OhlcvSeries> for MarketContext<'a> {
    fn from(series: &'a OhlcvSeries) -> Self {
        Self::new(series.view())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InequalityOutcome {
    pub id: String,
    pub result: bool,
    pub left_value: Option<f64>,
    pub right_value: Option<f64>,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupOutcome {
    pub id: String,
    pub logic: Logic,
    pub result: bool,
    pub satisfied: usize,
    pub required: usize,
    pub inequalities: Vec<InequalityOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySignal {
    pub entry: bool,
    pub exit: bool,
    pub entry_groups: Vec<GroupOutcome>,
    pub exit_groups: Vec<GroupOutcome>,
}

impl StrategySignal {
    pub fn action(&self, precedence: Precedence) -> SignalAction {
        precedence.resolve(self.entry, self.exit)
    }
}

/// Latest and previous value of a resolved operand.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tail {
    current: Option<f64>,
    previous: Option<f64>,
}

impl Tail {
    fn of(line: &[f64]) -> Self {
        Self::at(line, line.len(), line.len())
    }

    /// The last two of the first `bars` bars, for a line whose final element
    /// is bar `total - 1`.
    fn at(line: &[f64], total: usize, bars: usize) -> Self {
        let offset = total.saturating_sub(line.len());
        let value = |bar: usize| bar.checked_sub(offset).and_then(|i| line.get(i)).copied();
        Tail {
            current: bars.checked_sub(1).and_then(value),
            previous: bars.checked_sub(2).and_then(value),
        }
    }

    fn constant(value: f64) -> Self {
        Tail {
            current: Some(value),
            previous: Some(value),
        }
    }
}

/// Resolves the operands of one inequality. An indicator both sides read
/// is computed once.
struct OperandResolver<'c, 'a> {
    ctx: &'c MarketContext<'a>,
    computed: Vec<IndicatorResult>,
}

impl<'c, 'a> OperandResolver<'c, 'a> {
    fn new(ctx: &'c MarketContext<'a>) -> Self {
        Self {
            ctx,
            computed: Vec::new(),
        }
    }

    fn tail(&mut self, operand: &Operand) -> Result<Tail, RulecraftError> {
        match operand {
            Operand::Indicator(r) => {
                let (spec, field) = r.resolve()?;
                if let Some(tail) = self.ctx.precomputed_tail(&spec, field) {
                    return Ok(tail);
                }
                let index = match self.computed.iter().position(|c| c.spec == spec) {
                    Some(index) => index,
                    None => {
                        self.computed.push(calculate(&spec, self.ctx.view)?);
                        self.computed.len() - 1
                    }
                };
                Ok(Tail::of(self.computed[index].line(field)))
            }
            Operand::Price(field) => {
                let requester = format!("PRICE({})", field);
                Ok(Tail::of(self.ctx.view.require(*field, requester)?))
            }
            Operand::Value(v) => Ok(Tail::constant(*v)),
        }
    }
}

fn compare(condition: Condition, left: f64, right: f64) -> bool {
    let equal = (left - right).abs() < EPSILON;
    match condition {
        Condition::GreaterThan => left > right && !equal,
        Condition::LessThan => left < right && !equal,
        Condition::Equal => equal,
        Condition::GreaterThanOrEqual => left > right || equal,
        Condition::LessThanOrEqual => left < right || equal,
        Condition::CrossesAbove | Condition::CrossesBelow => false,
    }
}

fn crosses(condition: Condition, prev: (f64, f64), curr: (f64, f64)) -> bool {
    match condition {
        Condition::CrossesAbove => prev.0 <= prev.1 && curr.0 > curr.1,
        Condition::CrossesBelow => prev.0 >= prev.1 && curr.0 < curr.1,
        _ => false,
    }
}

impl InequalityOutcome {
    fn not_met(inequality: &Inequality) -> Self {
        InequalityOutcome {
            id: inequality.id.clone(),
            result: false,
            left_value: None,
            right_value: None,
            complete: false,
            explanation: inequality.explanation.clone(),
        }
    }
}

fn insufficient_history(inequality: &Inequality, ctx: &MarketContext<'_>) -> RulecraftError {
    match inequality.required_bars() {
        Ok(needed) => RulecraftError::InsufficientHistory {
            needed,
            available: ctx.bars(),
        },
        Err(e) => e,
    }
}

pub fn evaluate_inequality(
    inequality: &Inequality,
    ctx: &MarketContext<'_>,
) -> Result<InequalityOutcome, RulecraftError> {
    let (Some(left), Some(condition), Some(right)) =
        (&inequality.left, inequality.condition, &inequality.right)
    else {
        warn!(id = %inequality.id, rule = %inequality, "incomplete inequality treated as not met");
        return Ok(InequalityOutcome::not_met(inequality));
    };

    let mut resolver = OperandResolver::new(ctx);
    let l = resolver.tail(left)?;
    let r = resolver.tail(right)?;

    let (Some(lv), Some(rv)) = (l.current, r.current) else {
        return Err(insufficient_history(inequality, ctx));
    };

    let result = if condition.is_crossing() {
        let (Some(lp), Some(rp)) = (l.previous, r.previous) else {
            return Err(insufficient_history(inequality, ctx));
        };
        crosses(condition, (lp, rp), (lv, rv))
    } else {
        compare(condition, lv, rv)
    };

    debug!(
        id = %inequality.id,
        rule = %inequality,
        left = lv,
        right = rv,
        result,
        "inequality evaluated"
    );

    Ok(InequalityOutcome {
        id: inequality.id.clone(),
        result,
        left_value: Some(lv),
        right_value: Some(rv),
        complete: true,
        explanation: inequality.explanation.clone(),
    })
}

pub fn evaluate_rule_group(
    group: &RuleGroup,
    ctx: &MarketContext<'_>,
) -> Result<GroupOutcome, RulecraftError> {
    let outcomes = group
        .inequalities
        .iter()
        .map(|ineq| evaluate_inequality(ineq, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    let satisfied = outcomes.iter().filter(|o| o.result).count();

    let (result, required) = match group.logic {
        Logic::And => (satisfied == outcomes.len(), outcomes.len()),
        Logic::Or => {
            let required = group.required_conditions();
            (satisfied >= required, required)
        }
    };

    debug!(id = %group.id, logic = %group.logic, satisfied, required, result, "rule group evaluated");

    Ok(GroupOutcome {
        id: group.id.clone(),
        logic: group.logic,
        result,
        satisfied,
        required,
        inequalities: outcomes,
    })
}

/// One side (entry or exit) of a strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideOutcome {
    pub fired: bool,
    pub groups: Vec<GroupOutcome>,
}

/// The side fires when any of its groups holds. No groups, no signal.
pub fn evaluate_side(
    groups: &[RuleGroup],
    ctx: &MarketContext<'_>,
) -> Result<SideOutcome, RulecraftError> {
    let groups = groups
        .iter()
        .map(|g| evaluate_rule_group(g, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    let fired = groups.iter().any(|o| o.result);
    Ok(SideOutcome { fired, groups })
}

/// Both sides, each through [`evaluate_side`]. An error on either side is
/// returned; callers that can act on one side alone use `evaluate_side`.
pub fn evaluate_strategy(
    entry_groups: &[RuleGroup],
    exit_groups: &[RuleGroup],
    ctx: &MarketContext<'_>,
) -> Result<StrategySignal, RulecraftError> {
    let entry = evaluate_side(entry_groups, ctx);
    let exit = evaluate_side(exit_groups, ctx);
    let (entry, exit) = (entry?, exit?);
    Ok(StrategySignal {
        entry: entry.fired,
        exit: exit.fired,
        entry_groups: entry.groups,
        exit_groups: exit.groups,
    })
}

impl Strategy {
    pub fn evaluate(&self, ctx: &MarketContext<'_>) -> Result<StrategySignal, RulecraftError> {
        evaluate_strategy(&self.entry_rules, &self.exit_rules, ctx)
    }
}

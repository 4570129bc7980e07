//! Historical signal scanning.
//!
//! Replays a strategy bar by bar: the evaluation at index `i` only sees
//! bars `0..=i`, exactly as a live evaluation at that bar would. Indicators
//! are computed once over the whole series and read at each bar.

use crate::domain::error::RulecraftError;
use crate::domain::ohlcv::OhlcvSeries;
use crate::domain::rule_eval::{evaluate_side, MarketContext, PrecomputedIndicators, SideOutcome};
use crate::domain::signal::{Precedence, SignalAction};
use crate::domain::strategy::Strategy;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanPoint {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDateTime>,
    pub action: SignalAction,
    pub entry: bool,
    pub exit: bool,
    /// Some entry operand had no value yet at this bar.
    pub entry_warming_up: bool,
    /// Some exit operand had no value yet at this bar.
    pub exit_warming_up: bool,
}

impl ScanPoint {
    pub fn warming_up(&self) -> bool {
        self.entry_warming_up || self.exit_warming_up
    }
}

/// `(fired, warming_up)` for one side at one bar.
fn side_state(outcome: Result<SideOutcome, RulecraftError>) -> Result<(bool, bool), RulecraftError> {
    match outcome {
        Ok(side) => Ok((side.fired, false)),
        Err(RulecraftError::InsufficientHistory { .. }) => Ok((false, true)),
        Err(e) => Err(e),
    }
}

/// One point per bar. A side without enough history for every operand is
/// warming up and does not fire; the other side still drives the action.
/// Any other error stops the scan.
pub fn scan_signals(
    strategy: &Strategy,
    series: &OhlcvSeries,
    precedence: Precedence,
) -> Result<Vec<ScanPoint>, RulecraftError> {
    let view = series.view();
    let dates = series.dates();
    let indicators = PrecomputedIndicators::for_strategy(strategy, view);
    let mut points = Vec::with_capacity(series.len());

    for index in 0..series.len() {
        let ctx = MarketContext::new(view.prefix(index + 1)).with_indicators(&indicators);
        let (entry, entry_warming_up) = side_state(evaluate_side(&strategy.entry_rules, &ctx))?;
        let (exit, exit_warming_up) = side_state(evaluate_side(&strategy.exit_rules, &ctx))?;
        points.push(ScanPoint {
            index,
            date: dates.get(index).copied(),
            action: precedence.resolve(entry, exit),
            entry,
            exit,
            entry_warming_up,
            exit_warming_up,
        });
    }

    let warm = points.iter().filter(|p| p.warming_up()).count();
    debug!(bars = points.len(), warming_up = warm, "scan complete");
    Ok(points)
}

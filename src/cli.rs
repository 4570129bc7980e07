//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_strategy_adapter::JsonStrategyAdapter;
use crate::domain::config_validation::{
    build_evaluation_config, build_logging_config, data_dir, EvaluationConfig, LoggingConfig,
};
use crate::domain::error::RulecraftError;
use crate::domain::indicator::calculate;
use crate::domain::ohlcv::OhlcvSeries;
use crate::domain::params::{IndicatorParams, ParamValue};
use crate::domain::rule::{IndicatorRef, RuleGroup};
use crate::domain::rule_eval::{GroupOutcome, MarketContext, StrategySignal};
use crate::domain::scan::scan_signals;
use crate::domain::signal::{Precedence, SignalAction};
use crate::domain::strategy::Strategy;
use crate::logging::init_logging;
use crate::ports::data_port::DataPort;
use crate::ports::strategy_port::StrategyPort;

#[derive(Parser, Debug)]
#[command(name = "rulecraft", about = "Trading rule evaluation and indicator engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a strategy on the latest bar of a symbol
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay a strategy over every bar of a symbol
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Only print bars that enter or exit
        #[arg(long)]
        signals_only: bool,
        #[arg(long)]
        json: bool,
    },
    /// Compute one indicator over a CSV file
    Indicator {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        name: String,
        /// Indicator parameter as key=value, repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, ParamValue)>,
        /// Line of a multi-line indicator (e.g. "Signal Value")
        #[arg(long)]
        value_type: Option<String>,
        /// Number of trailing values to print
        #[arg(long, default_value_t = 10)]
        last: usize,
    },
    /// Check a strategy file and report incomplete rules
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// List symbols available in the data directory
    Symbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Evaluate {
            config,
            symbol,
            strategy,
            json,
        } => run_evaluate(&config, symbol.as_deref(), strategy.as_ref(), json),
        Command::Scan {
            config,
            symbol,
            strategy,
            signals_only,
            json,
        } => run_scan(&config, symbol.as_deref(), strategy.as_ref(), signals_only, json),
        Command::Indicator {
            data,
            name,
            params,
            value_type,
            last,
        } => run_indicator(&data, &name, params, value_type.as_deref(), last),
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Symbols { config } => run_symbols(&config),
    }
}

fn fail(err: RulecraftError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// `key=value`; numeric values become numbers, anything else stays text.
pub fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }
    let value = value.trim();
    let value = match value.parse::<f64>() {
        Ok(n) if n.is_finite() => ParamValue::Number(n),
        _ => ParamValue::Text(value.to_string()),
    };
    Ok((key.to_string(), value))
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Config loaded, logging up, data and strategy in hand.
struct Prepared {
    config: EvaluationConfig,
    series: OhlcvSeries,
    strategy: Strategy,
}

fn prepare(
    config_path: &Path,
    symbol_override: Option<&str>,
    strategy_override: Option<&PathBuf>,
) -> Result<Prepared, ExitCode> {
    // Stage 1: Load config and start logging
    let adapter = load_config(config_path)?;
    let logging = build_logging_config(&adapter).map_err(fail)?;
    init_logging(&logging);
    tracing::info!(config = %config_path.display(), "config loaded");

    // Stage 2: Validate and build evaluation config
    let config =
        build_evaluation_config(&adapter, symbol_override, strategy_override).map_err(fail)?;

    // Stage 3: Load bars
    eprintln!("Loading {} from {}", config.symbol, config.data_dir.display());
    let data = CsvAdapter::new(config.data_dir.clone());
    let bars = data.fetch_ohlcv(&config.symbol).map_err(fail)?;
    if bars.len() < config.min_bars {
        return Err(fail(RulecraftError::InsufficientHistory {
            needed: config.min_bars,
            available: bars.len(),
        }));
    }
    let series = OhlcvSeries::from_bars(&bars);

    // Stage 4: Load strategy
    eprintln!("Loading strategy from {}", config.strategy_path.display());
    let strategy = JsonStrategyAdapter::new()
        .load_strategy(&config.strategy_path)
        .map_err(fail)?;
    let report = strategy.check().map_err(fail)?;
    for (group, inequality) in &report.incomplete {
        tracing::warn!(group = %group, inequality = %inequality, "incomplete inequality will never be met");
    }
    tracing::info!(
        strategy = %strategy.name,
        bars = series.len(),
        required_bars = report.required_bars,
        "ready to evaluate"
    );

    Ok(Prepared {
        config,
        series,
        strategy,
    })
}

#[derive(Serialize)]
struct EvaluationReport<'a> {
    strategy: &'a str,
    symbol: &'a str,
    bars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    precedence: Precedence,
    action: SignalAction,
    #[serde(flatten)]
    signal: &'a StrategySignal,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RulecraftError> {
    Ok(serde_json::to_string_pretty(value).map_err(std::io::Error::from)?)
}

fn run_evaluate(
    config_path: &Path,
    symbol: Option<&str>,
    strategy_path: Option<&PathBuf>,
    json: bool,
) -> ExitCode {
    let prepared = match prepare(config_path, symbol, strategy_path) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let Prepared {
        config,
        series,
        strategy,
    } = &prepared;

    let signal = match strategy.evaluate(&MarketContext::from(series)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let action = signal.action(config.precedence);
    let date = series.dates().last().map(|d| d.to_string());

    if json {
        let report = EvaluationReport {
            strategy: &strategy.name,
            symbol: &config.symbol,
            bars: series.len(),
            date,
            precedence: config.precedence,
            action,
            signal: &signal,
        };
        return match to_json(&report) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        };
    }

    println!(
        "Strategy: {} ({}, {} bars{})",
        strategy.name,
        config.symbol,
        series.len(),
        date.map(|d| format!(", last {d}")).unwrap_or_default()
    );
    println!("Entry: {}", signal.entry);
    print_groups(&strategy.entry_rules, &signal.entry_groups);
    println!("Exit: {}", signal.exit);
    print_groups(&strategy.exit_rules, &signal.exit_groups);
    println!("Action: {} ({})", action, config.precedence);
    ExitCode::SUCCESS
}

fn fmt_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string())
}

fn print_groups(groups: &[RuleGroup], outcomes: &[GroupOutcome]) {
    for (group, outcome) in groups.iter().zip(outcomes) {
        println!(
            "  [{} {} {}/{}] {}",
            outcome.id, outcome.logic, outcome.satisfied, outcome.required, outcome.result
        );
        for (inequality, result) in group.inequalities.iter().zip(&outcome.inequalities) {
            let status = if result.complete {
                result.result.to_string()
            } else {
                "incomplete".to_string()
            };
            println!(
                "    {} {}: {} vs {} -> {}",
                result.id,
                inequality,
                fmt_value(result.left_value),
                fmt_value(result.right_value),
                status
            );
            if let Some(explanation) = &result.explanation {
                println!("      {explanation}");
            }
        }
    }
}

fn run_scan(
    config_path: &Path,
    symbol: Option<&str>,
    strategy_path: Option<&PathBuf>,
    signals_only: bool,
    json: bool,
) -> ExitCode {
    let Prepared {
        config,
        series,
        strategy,
    } = match prepare(config_path, symbol, strategy_path) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let points = match scan_signals(&strategy, &series, config.precedence) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let points: Vec<_> = points
        .into_iter()
        .filter(|p| !signals_only || p.action != SignalAction::Hold)
        .collect();

    if json {
        return match to_json(&points) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        };
    }

    for point in &points {
        let date = point.date.map(|d| d.to_string()).unwrap_or_default();
        let note = if point.warming_up() { " (warming up)" } else { "" };
        println!("{}\t{}\t{}{}", point.index, date, point.action, note);
    }
    let enters = points.iter().filter(|p| p.action == SignalAction::Enter).count();
    let exits = points.iter().filter(|p| p.action == SignalAction::Exit).count();
    eprintln!("{} bars, {} enter, {} exit", series.len(), enters, exits);
    ExitCode::SUCCESS
}

fn run_indicator(
    data_path: &Path,
    name: &str,
    params: Vec<(String, ParamValue)>,
    value_type: Option<&str>,
    last: usize,
) -> ExitCode {
    init_logging(&LoggingConfig::default());

    let series = match CsvAdapter::load_series(data_path) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let mut parameters = IndicatorParams::new();
    for (key, value) in params {
        parameters.insert(&key, value);
    }
    let mut reference = IndicatorRef::new(name, parameters);
    if let Some(vt) = value_type {
        reference = reference.with_value_type(vt);
    }

    let (spec, field) = match reference.resolve() {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let result = match calculate(&spec, series.view()) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };
    let line = result.line(field);
    eprintln!("{} over {} bars: {} values", spec, series.len(), line.len());

    // Lines end on the latest bar.
    let offset = series.len().saturating_sub(line.len());
    let start = line.len().saturating_sub(last);
    for (i, value) in line.iter().enumerate().skip(start) {
        match series.dates().get(offset + i) {
            Some(date) => println!("{}\t{:.6}", date, value),
            None => println!("{}\t{:.6}", offset + i, value),
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(strategy_path: &Path) -> ExitCode {
    init_logging(&LoggingConfig::default());
    eprintln!("Validating strategy: {}", strategy_path.display());

    let strategy = match JsonStrategyAdapter::new().load_strategy(strategy_path) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let report = match strategy.check() {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    println!("Strategy: {}", strategy.name);
    println!(
        "  {} entry groups, {} exit groups, {} inequalities",
        report.entry_groups, report.exit_groups, report.inequalities
    );
    println!("  Requires {} bars of history", report.required_bars);
    if report.incomplete.is_empty() {
        println!("  All inequalities complete");
    } else {
        println!("  Incomplete inequalities (never met):");
        for (group, inequality) in &report.incomplete {
            println!("    [{}] {}", group, inequality);
        }
    }
    ExitCode::SUCCESS
}

fn run_symbols(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let dir = match data_dir(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let symbols = match CsvAdapter::new(dir.clone()).list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir.display());
    }
    for symbol in &symbols {
        println!("{}", symbol);
    }
    ExitCode::SUCCESS
}

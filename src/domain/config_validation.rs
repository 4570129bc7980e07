//! Configuration validation.
//!
//! Validates every config field before an evaluation runs and builds the
//! typed configuration the CLI works from.

use crate::domain::error::RulecraftError;
use crate::domain::signal::Precedence;
use crate::ports::config_port::ConfigPort;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" | "human" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}', expected pretty or json", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub data_dir: PathBuf,
    pub symbol: String,
    pub strategy_path: PathBuf,
    pub precedence: Precedence,
    /// Refuse to evaluate with fewer bars than this; 0 disables the check.
    pub min_bars: usize,
}

/// Check every key that has a fixed format. Keys that command-line flags
/// can supply (`[data] symbol`, `[strategy] path`) are checked by
/// [`build_evaluation_config`].
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), RulecraftError> {
    validate_data_dir(config)?;
    validate_precedence(config)?;
    validate_min_bars(config)?;
    validate_logging(config)?;
    Ok(())
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, reason: String) -> RulecraftError {
    RulecraftError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

fn missing(section: &str, key: &str) -> RulecraftError {
    RulecraftError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), RulecraftError> {
    data_dir(config).map(|_| ())
}

/// `[data] dir`, the only key every command that touches data needs.
pub fn data_dir(config: &dyn ConfigPort) -> Result<PathBuf, RulecraftError> {
    non_empty(config, "data", "dir")
        .map(PathBuf::from)
        .ok_or_else(|| missing("data", "dir"))
}

fn validate_precedence(config: &dyn ConfigPort) -> Result<(), RulecraftError> {
    parse_precedence(config).map(|_| ())
}

fn parse_precedence(config: &dyn ConfigPort) -> Result<Precedence, RulecraftError> {
    match non_empty(config, "evaluation", "precedence") {
        None => Ok(Precedence::default()),
        Some(value) => value
            .parse()
            .map_err(|reason| invalid("evaluation", "precedence", reason)),
    }
}

fn validate_min_bars(config: &dyn ConfigPort) -> Result<(), RulecraftError> {
    parse_min_bars(config).map(|_| ())
}

fn parse_min_bars(config: &dyn ConfigPort) -> Result<usize, RulecraftError> {
    match non_empty(config, "evaluation", "min_bars") {
        None => Ok(0),
        Some(value) => value.parse::<usize>().map_err(|_| {
            invalid(
                "evaluation",
                "min_bars",
                format!("min_bars must be a non-negative integer, got '{}'", value),
            )
        }),
    }
}

fn validate_logging(config: &dyn ConfigPort) -> Result<(), RulecraftError> {
    build_logging_config(config).map(|_| ())
}

/// `[logging]` with defaults `info` / `pretty`.
pub fn build_logging_config(config: &dyn ConfigPort) -> Result<LoggingConfig, RulecraftError> {
    let level = match non_empty(config, "logging", "level") {
        None => "info".to_string(),
        Some(level) => {
            let level = level.to_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(invalid(
                    "logging",
                    "level",
                    format!("level must be one of {}", LOG_LEVELS.join(", ")),
                ));
            }
            level
        }
    };
    let format = match non_empty(config, "logging", "format") {
        None => LogFormat::default(),
        Some(format) => format
            .parse()
            .map_err(|reason| invalid("logging", "format", reason))?,
    };
    Ok(LoggingConfig { level, format })
}

/// Typed evaluation settings. Command-line overrides win over the file.
pub fn build_evaluation_config(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
    strategy_override: Option<&PathBuf>,
) -> Result<EvaluationConfig, RulecraftError> {
    validate_config(config)?;

    let data_dir = data_dir(config)?;
    let symbol = match symbol_override.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => non_empty(config, "data", "symbol").ok_or_else(|| missing("data", "symbol"))?,
    };
    let strategy_path = match strategy_override {
        Some(p) => p.clone(),
        None => non_empty(config, "strategy", "path")
            .map(PathBuf::from)
            .ok_or_else(|| missing("strategy", "path"))?,
    };

    Ok(EvaluationConfig {
        data_dir,
        symbol,
        strategy_path,
        precedence: parse_precedence(config)?,
        min_bars: parse_min_bars(config)?,
    })
}

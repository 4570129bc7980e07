//! Domain error types.

/// Top-level error type for rulecraft.
#[derive(Debug, thiserror::Error)]
pub enum RulecraftError {
    #[error("indicator {indicator} requires the {field} series")]
    MissingSeries { field: String, indicator: String },

    #[error("unsupported indicator: {name}")]
    UnsupportedIndicator { name: String },

    #[error("insufficient history: have {available} bars, need {needed}")]
    InsufficientHistory { needed: usize, available: usize },

    #[error("invalid parameter {key} for {indicator}: {reason}")]
    InvalidParameter {
        indicator: String,
        key: String,
        reason: String,
    },

    #[error("series length mismatch: {field} has {actual} values, close has {expected}")]
    SeriesLengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("strategy parse error in {source_name}: {reason}")]
    StrategyParse { source_name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RulecraftError {
    pub(crate) fn missing_series(field: &str, indicator: impl ToString) -> Self {
        RulecraftError::MissingSeries {
            field: field.to_string(),
            indicator: indicator.to_string(),
        }
    }

    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            RulecraftError::Io(_) => 1,
            RulecraftError::ConfigParse { .. }
            | RulecraftError::ConfigMissing { .. }
            | RulecraftError::ConfigInvalid { .. } => 2,
            RulecraftError::Data { .. }
            | RulecraftError::MissingSeries { .. }
            | RulecraftError::SeriesLengthMismatch { .. } => 3,
            RulecraftError::StrategyParse { .. }
            | RulecraftError::UnsupportedIndicator { .. }
            | RulecraftError::InvalidParameter { .. } => 4,
            RulecraftError::InsufficientHistory { .. } => 5,
        }
    }
}

impl From<&RulecraftError> for std::process::ExitCode {
    fn from(err: &RulecraftError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

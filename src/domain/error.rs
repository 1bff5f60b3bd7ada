//! Domain error types.

/// Top-level error type for tickreplay.
///
/// Only failures that prevent a run from starting (or its results from being
/// written) surface through this type. Per-tick problems are [`TickError`]s
/// and end up in the error log instead.
#[derive(Debug, thiserror::Error)]
pub enum TickreplayError {
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

    #[error("no observations to replay")]
    EmptyFeed,

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TickreplayError> for std::process::ExitCode {
    fn from(err: &TickreplayError) -> Self {
        let code: u8 = match err {
            TickreplayError::Io(_) | TickreplayError::Report { .. } => 1,
            TickreplayError::ConfigParse { .. }
            | TickreplayError::ConfigMissing { .. }
            | TickreplayError::ConfigInvalid { .. } => 2,
            TickreplayError::Data { .. } | TickreplayError::EmptyFeed => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Raised by a strategy while computing a signal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct StrategyError {
    pub message: String,
}

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A failure confined to a single tick. The engine records it and moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    #[error("malformed observation: {reason}")]
    MalformedObservation { reason: String },

    #[error("strategy {strategy} failed: {source}")]
    StrategyFailure {
        strategy: String,
        #[source]
        source: StrategyError,
    },
}

impl TickError {
    /// Short, stable label used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            TickError::MalformedObservation { .. } => "malformed_observation",
            TickError::StrategyFailure { .. } => "strategy_failure",
        }
    }
}

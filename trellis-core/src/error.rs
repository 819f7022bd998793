//! Error types for the reactive engine.

use thiserror::Error;

/// Errors produced by watchers, the scheduler, and the observation layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReactiveError {
    /// A watcher's evaluator reported a failure.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// A watcher's evaluator panicked while the scheduler was flushing.
    #[error("watcher \"{expression}\" panicked: {message}")]
    Panicked { expression: String, message: String },

    /// A watcher kept re-queueing itself within a single flush.
    #[error("possible infinite update loop in watcher \"{expression}\" (more than {limit} runs in one flush)")]
    InfiniteUpdateLoop { expression: String, limit: usize },

    /// A watch path contained characters outside `[A-Za-z0-9_$.]`.
    #[error("failed watching path \"{0}\": only simple dot-delimited paths are accepted")]
    InvalidPath(String),

    /// A prop failed its required, type, or validator check.
    #[error("invalid prop \"{name}\": {reason}")]
    InvalidProp { name: String, reason: String },

    /// The watcher was torn down and can no longer evaluate.
    #[error("watcher has been torn down")]
    Inactive,

    /// A configuration document could not be parsed.
    #[error("invalid config: {0}")]
    Config(String),
}

impl ReactiveError {
    /// Shorthand for an evaluator failure.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }
}

impl From<serde_json::Error> for ReactiveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_error_displays_message() {
        let err = ReactiveError::evaluation("boom");
        assert_eq!(err.to_string(), "evaluation failed: boom");
    }

    #[test]
    fn config_error_converts_from_serde() {
        let err: ReactiveError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ReactiveError::Config(_)));
    }
}

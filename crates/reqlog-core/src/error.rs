//! Error types for request logging.

use thiserror::Error;

use reqlog_telemetry::FailureStage;

/// Primary error type returned by request and stream loggers.
///
/// Both variants render the underlying failure text so callers can surface the
/// collector's or builder's own message.
#[derive(Debug, Error)]
pub enum LogError {
    /// The message-construction hook could not build a payload.
    #[error("failed to create log message: {source}")]
    MessageConstruction {
        /// Failure reported by the hook.
        source: anyhow::Error,
    },
    /// The collector rejected or failed to accept the payload.
    #[error("failed to collect log message: {source}")]
    Collection {
        /// Failure reported by the collector.
        source: anyhow::Error,
    },
}

impl LogError {
    /// Stage at which the logging attempt failed.
    #[must_use]
    pub const fn stage(&self) -> FailureStage {
        match self {
            Self::MessageConstruction { .. } => FailureStage::Construction,
            Self::Collection { .. } => FailureStage::Collection,
        }
    }
}

/// Convenience alias for logging results.
pub type LogResult<T> = Result<T, LogError>;

//! # Design
//!
//! - Centralize server-level errors for collector construction and bootstrap.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Server-level error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No factory is registered for the requested collector type.
    #[error("unknown log collector type: {collector_type}")]
    UnknownCollectorType {
        /// Requested collector type.
        collector_type: String,
    },
    /// A factory for the collector type was already registered.
    #[error("log collector type already registered: {collector_type}")]
    DuplicateCollectorType {
        /// Collector type registered twice.
        collector_type: String,
    },
    /// A registered factory failed to build its collector.
    #[error("failed to create {collector_type} log collector")]
    CollectorConstruction {
        /// Collector type whose factory failed.
        collector_type: String,
        /// Source factory error.
        source: anyhow::Error,
    },
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: reqlog_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: reqlog_telemetry::TelemetryError,
    },
}

impl ServerError {
    pub(crate) const fn config(operation: &'static str, source: reqlog_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: reqlog_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }
}

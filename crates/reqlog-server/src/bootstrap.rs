//! # Design
//!
//! - Build metrics, the collector registry and the server logger from one validated
//!   serving document.
//! - Global subscriber installation is separate from runtime construction so tests can
//!   build runtimes without touching process-wide state.

use std::path::Path;
use std::sync::Arc;

use reqlog_collectors::DrainReport;
use reqlog_config::{ServingLogConfig, load_from_path, validate_serving_config};
use reqlog_core::LogMessageBuilder;
use reqlog_telemetry::{LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};
use crate::registry::CollectorRegistry;
use crate::server_logger::ServerRequestLogger;

/// Install the global tracing subscriber described by `config`.
///
/// # Errors
///
/// Returns [`ServerError::Telemetry`] when a global subscriber is already installed.
pub fn init_telemetry(config: &ServingLogConfig) -> ServerResult<()> {
    let format = config
        .log_format
        .as_deref()
        .map_or_else(LogFormat::infer, LogFormat::from_name);
    init_logging(&LoggingConfig {
        level: &config.log_level,
        format,
        with_target: format == LogFormat::Pretty,
    })
    .map_err(|err| ServerError::telemetry("telemetry.init", err))
}

/// Request logging wired up for one serving process.
pub struct ServingLogRuntime<B> {
    logger: Arc<ServerRequestLogger<B>>,
    registry: Arc<CollectorRegistry>,
    metrics: Metrics,
}

impl<B: LogMessageBuilder + Clone> ServingLogRuntime<B> {
    /// Build the runtime from a serving document.
    ///
    /// Must run inside a tokio runtime when file-backed collectors are configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the document is invalid, metrics cannot be registered or a
    /// collector cannot be created.
    pub fn start(config: &ServingLogConfig, builder: B) -> ServerResult<Self> {
        validate_serving_config(config)
            .map_err(|err| ServerError::config("serving_config.validate", err))?;
        let metrics =
            Metrics::new().map_err(|err| ServerError::telemetry("telemetry.metrics", err))?;
        let registry = Arc::new(CollectorRegistry::with_defaults(
            config.collector_queue_capacity,
            Some(metrics.clone()),
        ));
        let logger = ServerRequestLogger::new(
            Arc::clone(&registry),
            builder,
            config.deployment_tags.iter().cloned(),
        )
        .with_metrics(metrics.clone());
        logger.update(&config.models)?;
        info!(
            models = config.models.len(),
            tags = config.deployment_tags.len(),
            "request logging started"
        );
        Ok(Self {
            logger: Arc::new(logger),
            registry,
            metrics,
        })
    }

    /// Load the serving document at `path` and build the runtime from it.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the document cannot be loaded, plus every
    /// error of [`Self::start`].
    pub async fn start_from_path(path: impl AsRef<Path>, builder: B) -> ServerResult<Self> {
        let config = load_from_path(path)
            .await
            .map_err(|err| ServerError::config("serving_config.load", err))?;
        Self::start(&config, builder)
    }

    /// Shared server logger handed to the serving methods.
    #[must_use]
    pub fn logger(&self) -> Arc<ServerRequestLogger<B>> {
        Arc::clone(&self.logger)
    }

    /// Metrics recorded by every logger of this runtime.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Drop the loggers and wait for every drain task to flush.
    ///
    /// Drain tasks only finish once no other handle to their collector is alive, so
    /// clones of [`Self::logger`] and live stream loggers must be dropped first.
    pub async fn shutdown(self) -> Vec<DrainReport> {
        let Self {
            logger, registry, ..
        } = self;
        drop(logger);
        let mut reports = Vec::new();
        for handle in registry.take_drains() {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(err) => warn!(error = %err, "request log drain task failed"),
            }
        }
        info!(drains = reports.len(), "request logging shut down");
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqlog_config::{LogCollectorConfig, LoggingConfig};
    use reqlog_core::{SamplingConfig, ServingLogBuilder};

    #[test]
    fn invalid_document_is_rejected_before_wiring() {
        let config = ServingLogConfig {
            deployment_tags: vec![" ".to_string()],
            ..ServingLogConfig::default()
        };
        let err = ServingLogRuntime::start(&config, ServingLogBuilder)
            .err()
            .expect("blank tag is invalid");
        assert!(matches!(err, ServerError::Config { operation: "serving_config.validate", .. }));
    }

    #[test]
    fn discard_models_start_without_a_runtime() {
        let mut config = ServingLogConfig::default();
        config.models.insert(
            "resnet".to_string(),
            vec![LoggingConfig {
                sampling_config: SamplingConfig::always(),
                log_collector_config: LogCollectorConfig {
                    collector_type: "discard".to_string(),
                    filename_prefix: String::new(),
                },
            }],
        );
        let runtime = ServingLogRuntime::start(&config, ServingLogBuilder).expect("runtime");
        assert_eq!(runtime.logger().models(), vec!["resnet"]);
        assert_eq!(runtime.logger().loggers_for("resnet").len(), 1);
    }
}

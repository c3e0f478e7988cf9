//! # Design
//!
//! - Calls are routed by model name to every logger configured for that model.
//! - The routing table is an immutable snapshot behind an `RwLock`; calls clone the
//!   `Arc` and release the lock before logging, so reconfiguration never waits on
//!   in-flight calls and never invalidates live stream loggers.
//! - Reconfiguration reuses the logger of an identical configuration, keeping its
//!   collector (and any queued messages) alive.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use reqlog_config::{LoggingConfig, ModelLoggingConfigs, validate_logging_config};
use reqlog_core::{
    LogMessageBuilder, LogMetadata, LogResult, RequestLogger, StreamLogSource, StreamLogger,
};
use reqlog_telemetry::Metrics;
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};
use crate::registry::CollectorRegistry;

struct ConfiguredLogger<B> {
    config: LoggingConfig,
    logger: Arc<RequestLogger<B>>,
}

impl<B> Clone for ConfiguredLogger<B> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            logger: Arc::clone(&self.logger),
        }
    }
}

type RoutingTable<B> = BTreeMap<String, Arc<[ConfiguredLogger<B>]>>;

/// Routes served calls to the request loggers configured for their model.
pub struct ServerRequestLogger<B> {
    registry: Arc<CollectorRegistry>,
    builder: B,
    deployment_tags: Vec<String>,
    metrics: Option<Metrics>,
    models: RwLock<Arc<RoutingTable<B>>>,
}

impl<B: LogMessageBuilder + Clone> ServerRequestLogger<B> {
    /// Logger with no models configured.
    #[must_use]
    pub fn new<I, S>(registry: Arc<CollectorRegistry>, builder: B, deployment_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registry,
            builder,
            deployment_tags: deployment_tags.into_iter().map(Into::into).collect(),
            metrics: None,
            models: RwLock::new(Arc::new(RoutingTable::new())),
        }
    }

    /// Report sampling decisions and failures of every logger to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the model configurations.
    ///
    /// Every configuration is validated and every collector type resolved before any
    /// collector is created; on error the previous table stays in effect. Models with
    /// an empty entry list are left unconfigured.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for an invalid configuration,
    /// [`ServerError::UnknownCollectorType`] for an unregistered collector type and the
    /// registry's errors when a collector cannot be created.
    pub fn update(&self, configs: &ModelLoggingConfigs) -> ServerResult<()> {
        for (model, entries) in configs {
            for (index, config) in entries.iter().enumerate() {
                validate_logging_config(&format!("models.{model}[{index}]"), config)
                    .map_err(|err| ServerError::config("server_logger.update", err))?;
            }
        }
        if let Some(unknown) = configs
            .values()
            .flatten()
            .map(|config| &config.log_collector_config.collector_type)
            .find(|collector_type| !self.registry.contains(collector_type))
        {
            return Err(ServerError::UnknownCollectorType {
                collector_type: unknown.clone(),
            });
        }

        let previous = self.snapshot();
        let mut pool: Vec<ConfiguredLogger<B>> =
            previous.values().flat_map(|entries| entries.iter().cloned()).collect();
        let mut reused = 0_usize;
        let mut table = RoutingTable::new();
        for (model, entries) in configs.iter().filter(|(_, entries)| !entries.is_empty()) {
            let mut loggers = Vec::with_capacity(entries.len());
            for config in entries {
                if let Some(existing) = pool.iter().find(|entry| entry.config == *config) {
                    reused += 1;
                    loggers.push(existing.clone());
                    continue;
                }
                let entry = ConfiguredLogger {
                    config: config.clone(),
                    logger: Arc::new(self.build_logger(config)?),
                };
                pool.push(entry.clone());
                loggers.push(entry);
            }
            table.insert(model.clone(), Arc::from(loggers));
        }

        info!(models = table.len(), reused, "request logging configuration applied");
        *self.models.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
        Ok(())
    }

    /// Names of the models with at least one configured entry, in order.
    #[must_use]
    pub fn models(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// Request loggers configured for `model`, in configuration order.
    #[must_use]
    pub fn loggers_for(&self, model: &str) -> Vec<Arc<RequestLogger<B>>> {
        self.snapshot()
            .get(model)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| Arc::clone(&entry.logger))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Log a unary call through every logger of its model.
    ///
    /// Calls for models without configuration are a no-op.
    ///
    /// # Errors
    ///
    /// Every logger is attempted; the first failure is returned.
    pub fn log(
        &self,
        request: &B::Request,
        response: &B::Response,
        metadata: &LogMetadata,
    ) -> LogResult<()> {
        let loggers = self.loggers_for(&metadata.model_spec.name);
        if loggers.is_empty() {
            debug!(model = %metadata.model_spec.name, "no request loggers configured for model");
            return Ok(());
        }
        let mut first_error = None;
        for logger in loggers {
            if let Err(err) = logger.log(request, response, metadata)
                && first_error.is_none()
            {
                first_error = Some(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Start logging a stream through every logger of its model that samples it.
    ///
    /// Each logger samples independently. The factory runs at most once, when the
    /// first logger selects the stream; later selecting loggers are attached as
    /// additional bindings.
    pub fn maybe_start_logging_stream<S, F>(
        &self,
        metadata: &LogMetadata,
        factory: F,
    ) -> Option<StreamLogger<S>>
    where
        S: StreamLogSource,
        F: FnOnce() -> S,
    {
        let mut factory = Some(factory);
        let mut stream: Option<StreamLogger<S>> = None;
        for logger in self.loggers_for(&metadata.model_spec.name) {
            if !logger.sample(metadata) {
                continue;
            }
            let binding = logger.stream_binding(metadata);
            if let Some(active) = stream.as_mut() {
                active.attach(binding);
                continue;
            }
            let Some(make_source) = factory.take() else {
                continue;
            };
            let started = StreamLogger::new(make_source(), binding);
            stream = Some(match &self.metrics {
                Some(metrics) => {
                    metrics.inc_stream_started();
                    started.with_metrics(metrics.clone())
                }
                None => started,
            });
        }
        stream
    }

    fn build_logger(&self, config: &LoggingConfig) -> ServerResult<RequestLogger<B>> {
        let collector = self.registry.create(&config.log_collector_config)?;
        let logger = RequestLogger::new(
            config.sampling_config,
            self.deployment_tags.iter().cloned(),
            collector,
            self.builder.clone(),
        );
        Ok(match &self.metrics {
            Some(metrics) => logger.with_metrics(metrics.clone()),
            None => logger,
        })
    }

    fn snapshot(&self) -> Arc<RoutingTable<B>> {
        Arc::clone(&self.models.read().unwrap_or_else(PoisonError::into_inner))
    }
}

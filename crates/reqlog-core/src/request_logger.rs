//! Per-model-version request logger.
//!
//! # Design
//! - Configuration (sampling rate, tags, collector, builder) is fixed at construction
//!   and read without locks by every in-flight call.
//! - Sampling is decided once per unary call and once per stream, never per stream unit.
//! - Stream loggers receive their own copies of the metadata and collector handle, so
//!   dropping the request logger never affects streams it already started.

use std::sync::Arc;

use reqlog_telemetry::Metrics;
use tracing::{debug, trace, warn};

use crate::collector::LogCollector;
use crate::error::{LogError, LogResult};
use crate::metadata::MetadataAssembler;
use crate::model::{LogMessage, LogMetadata, SamplingConfig};
use crate::sampling::should_sample;
use crate::stream_logger::{StreamBinding, StreamLogSource, StreamLogger};

/// Builds the log payload for one kind of served call.
pub trait LogMessageBuilder: Send + Sync {
    /// Request type accepted by the serving method.
    type Request: ?Sized;
    /// Response type produced by the serving method.
    type Response: ?Sized;

    /// Build the payload for a sampled call.
    ///
    /// # Errors
    ///
    /// Returns an error when the request/response pair cannot be represented (for
    /// example an unsupported kind or malformed body). The call is not logged.
    fn create_log_message(
        &self,
        request: &Self::Request,
        response: &Self::Response,
        metadata: &LogMetadata,
    ) -> anyhow::Result<LogMessage>;
}

impl<B: LogMessageBuilder + ?Sized> LogMessageBuilder for Arc<B> {
    type Request = B::Request;
    type Response = B::Response;

    fn create_log_message(
        &self,
        request: &Self::Request,
        response: &Self::Response,
        metadata: &LogMetadata,
    ) -> anyhow::Result<LogMessage> {
        (**self).create_log_message(request, response, metadata)
    }
}

/// Coordinates sampling, metadata assembly, message construction and collection for
/// one served model version.
pub struct RequestLogger<B> {
    assembler: MetadataAssembler,
    collector: Arc<dyn LogCollector>,
    builder: B,
    metrics: Option<Metrics>,
}

impl<B: LogMessageBuilder> RequestLogger<B> {
    /// Create a logger with a fixed sampling configuration, tag set, collector and builder.
    ///
    /// The rate is expected to be validated by the caller.
    #[must_use]
    pub fn new<I, S>(
        sampling_config: SamplingConfig,
        deployment_tags: I,
        collector: Arc<dyn LogCollector>,
        builder: B,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            assembler: MetadataAssembler::new(sampling_config, deployment_tags),
            collector,
            builder,
            metrics: None,
        }
    }

    /// Report sampling decisions and failures to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Configured sampling configuration.
    #[must_use]
    pub const fn sampling_config(&self) -> SamplingConfig {
        self.assembler.sampling_config()
    }

    /// Configured deployment tags.
    #[must_use]
    pub fn deployment_tags(&self) -> &[String] {
        self.assembler.deployment_tags()
    }

    /// Collector that receives this logger's messages.
    #[must_use]
    pub fn collector(&self) -> &Arc<dyn LogCollector> {
        &self.collector
    }

    /// Log one unary call if sampling selects it.
    ///
    /// Returns `Ok(())` without side effects when the call is not selected.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::MessageConstruction`] when the builder fails (the collector
    /// is not called) and [`LogError::Collection`] when the collector rejects the
    /// message.
    pub fn log(
        &self,
        request: &B::Request,
        response: &B::Response,
        metadata: &LogMetadata,
    ) -> LogResult<()> {
        if !self.sample(metadata) {
            return Ok(());
        }

        let metadata = self.fill_log_metadata(metadata);
        let result = self
            .builder
            .create_log_message(request, response, &metadata)
            .map_err(|source| LogError::MessageConstruction { source })
            .and_then(|message| collect(self.collector.as_ref(), message));
        if let Err(err) = &result {
            self.record_failure(&metadata, err);
        }
        result
    }

    /// Complete caller-supplied metadata with this logger's sampling config and tags.
    #[must_use]
    pub fn fill_log_metadata(&self, partial: &LogMetadata) -> LogMetadata {
        self.assembler.assemble(partial)
    }

    /// Start logging a stream if sampling selects it.
    ///
    /// The factory is invoked at most once, and only when the stream is selected.
    /// The returned stream logger owns its metadata and a handle to the collector and
    /// stays usable after this request logger is dropped.
    pub fn maybe_start_logging_stream<S, F>(
        &self,
        metadata: &LogMetadata,
        factory: F,
    ) -> Option<StreamLogger<S>>
    where
        S: StreamLogSource,
        F: FnOnce() -> S,
    {
        if !self.sample(metadata) {
            return None;
        }

        let binding = self.stream_binding(metadata);
        if let Some(metrics) = &self.metrics {
            metrics.inc_stream_started();
        }
        let stream = StreamLogger::new(factory(), binding);
        Some(match &self.metrics {
            Some(metrics) => stream.with_metrics(metrics.clone()),
            None => stream,
        })
    }

    /// Evaluate the sampling decision for one call or stream.
    ///
    /// Each invocation draws independently.
    #[must_use]
    pub fn sample(&self, metadata: &LogMetadata) -> bool {
        let selected = should_sample(self.sampling_config().sampling_rate);
        match (&self.metrics, selected) {
            (Some(metrics), true) => metrics.inc_sampled(&metadata.model_spec.name),
            (Some(metrics), false) => metrics.inc_skipped(),
            (None, _) => {}
        }
        if selected {
            debug!(
                model = %metadata.model_spec.name,
                version = ?metadata.model_spec.version,
                "call selected for request logging"
            );
        } else {
            trace!(model = %metadata.model_spec.name, "call skipped by request log sampling");
        }
        selected
    }

    /// Binding carrying completed metadata and a clone of the collector handle.
    ///
    /// Used to attach this logger to a stream logger started elsewhere.
    #[must_use]
    pub fn stream_binding(&self, metadata: &LogMetadata) -> StreamBinding {
        StreamBinding::new(self.fill_log_metadata(metadata), Arc::clone(&self.collector))
    }

    fn record_failure(&self, metadata: &LogMetadata, err: &LogError) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_failure(err.stage());
        }
        warn!(
            model = %metadata.model_spec.name,
            stage = err.stage().as_str(),
            error = %err,
            "request logging failed"
        );
    }
}

/// Hand a built message to `collector`, wrapping a rejection.
pub(crate) fn collect(collector: &dyn LogCollector, message: LogMessage) -> LogResult<()> {
    collector
        .collect_message(message)
        .map_err(|source| LogError::Collection { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelSpec, RpcKind};
    use anyhow::{anyhow, bail};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<LogMessage>>,
    }

    impl LogCollector for Recorder {
        fn collect_message(&self, message: LogMessage) -> anyhow::Result<()> {
            self.messages
                .lock()
                .map_err(|_| anyhow!("recorder poisoned"))?
                .push(message);
            Ok(())
        }
    }

    struct Rejecting;

    impl LogCollector for Rejecting {
        fn collect_message(&self, _message: LogMessage) -> anyhow::Result<()> {
            bail!("Error")
        }
    }

    #[derive(Default)]
    struct EchoBuilder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl LogMessageBuilder for EchoBuilder {
        type Request = str;
        type Response = str;

        fn create_log_message(
            &self,
            request: &str,
            response: &str,
            metadata: &LogMetadata,
        ) -> anyhow::Result<LogMessage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("Error");
            }
            Ok(LogMessage {
                kind: RpcKind::Predict,
                metadata: metadata.clone(),
                request: json!(request),
                response: json!(response),
            })
        }
    }

    fn partial() -> LogMetadata {
        LogMetadata::for_model(ModelSpec::new("model").with_version(10))
    }

    #[test]
    fn sampled_call_builds_and_collects_once() {
        let recorder = Arc::new(Recorder::default());
        let builder = Arc::new(EchoBuilder::default());
        let logger = RequestLogger::new(
            SamplingConfig::always(),
            ["serve", "tpu"],
            recorder.clone(),
            Arc::clone(&builder),
        );

        logger
            .log("in", "out", &partial())
            .expect("logging should succeed");

        assert_eq!(builder.calls.load(Ordering::SeqCst), 1);
        let messages = recorder.messages.lock().expect("recorder lock");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].request, json!("in"));
        assert_eq!(messages[0].metadata.sampling_config, SamplingConfig::always());
        assert_eq!(messages[0].metadata.deployment_tags, vec!["serve", "tpu"]);
    }

    #[test]
    fn unsampled_call_has_no_side_effects() {
        let recorder = Arc::new(Recorder::default());
        let builder = Arc::new(EchoBuilder::default());
        let logger = RequestLogger::new(
            SamplingConfig::never(),
            ["serve"],
            recorder.clone(),
            Arc::clone(&builder),
        );

        for _ in 0..100 {
            logger
                .log("in", "out", &partial())
                .expect("skipped call should succeed");
        }
        assert_eq!(builder.calls.load(Ordering::SeqCst), 0);
        assert!(recorder.messages.lock().expect("recorder lock").is_empty());
    }

    #[test]
    fn builder_failure_skips_collector() {
        let recorder = Arc::new(Recorder::default());
        let builder = EchoBuilder {
            fail: true,
            ..EchoBuilder::default()
        };
        let logger = RequestLogger::new(
            SamplingConfig::always(),
            Vec::<String>::new(),
            recorder.clone(),
            builder,
        );

        let err = logger
            .log("in", "out", &partial())
            .expect_err("builder failure should surface");
        assert!(matches!(err, LogError::MessageConstruction { .. }));
        assert!(err.to_string().contains("Error"));
        assert!(recorder.messages.lock().expect("recorder lock").is_empty());
    }

    #[test]
    fn collector_failure_is_surfaced_after_one_build() {
        let builder = Arc::new(EchoBuilder::default());
        let logger = RequestLogger::new(
            SamplingConfig::always(),
            Vec::<String>::new(),
            Arc::new(Rejecting),
            Arc::clone(&builder),
        );

        let err = logger
            .log("in", "out", &partial())
            .expect_err("collector failure should surface");
        assert!(matches!(err, LogError::Collection { .. }));
        assert!(err.to_string().contains("Error"));
        assert_eq!(builder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn metrics_track_decisions_and_failures() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let logger = RequestLogger::new(
            SamplingConfig::always(),
            Vec::<String>::new(),
            Arc::new(Rejecting),
            EchoBuilder::default(),
        )
        .with_metrics(metrics.clone());
        assert!(logger.log("in", "out", &partial()).is_err());

        let skipping = RequestLogger::new(
            SamplingConfig::never(),
            Vec::<String>::new(),
            Arc::new(Rejecting),
            EchoBuilder::default(),
        )
        .with_metrics(metrics.clone());
        assert!(skipping.log("in", "out", &partial()).is_ok());

        assert_eq!(metrics.sampled_for("model"), 1);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.skipped_total, 1);
        assert_eq!(snapshot.collection_failures_total, 1);
        assert_eq!(snapshot.construction_failures_total, 0);
        Ok(())
    }
}

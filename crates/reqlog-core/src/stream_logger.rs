//! Per-stream logger with a lifetime independent of its creator.
//!
//! # Design
//! - A stream logger owns a per-stream hook ([`StreamLogSource`]) plus one or more
//!   bindings, each holding completed metadata and a collector handle captured at
//!   creation. Nothing points back at the request logger that created it.
//! - Units are forwarded synchronously, so the collector sees them in call order.

use std::sync::Arc;

use reqlog_telemetry::Metrics;
use tracing::warn;

use crate::collector::LogCollector;
use crate::error::{LogError, LogResult};
use crate::model::{LogMessage, LogMetadata};
use crate::request_logger::collect;

/// Per-stream hook that turns the current stream state into a log message.
pub trait StreamLogSource: Send {
    /// Build the payload for the current stream unit.
    ///
    /// # Errors
    ///
    /// Returns an error when the stream state cannot be represented; the unit is
    /// not logged.
    fn create_log_message(&self, metadata: &LogMetadata) -> anyhow::Result<LogMessage>;
}

/// Completed metadata and collector handle owned by a stream logger.
#[derive(Clone)]
pub struct StreamBinding {
    metadata: LogMetadata,
    collector: Arc<dyn LogCollector>,
}

impl StreamBinding {
    /// Bind `metadata` to `collector`.
    #[must_use]
    pub fn new(metadata: LogMetadata, collector: Arc<dyn LogCollector>) -> Self {
        Self {
            metadata,
            collector,
        }
    }

    /// Metadata attached to every message logged through this binding.
    #[must_use]
    pub const fn metadata(&self) -> &LogMetadata {
        &self.metadata
    }

    fn log<S: StreamLogSource + ?Sized>(&self, hook: &S) -> LogResult<()> {
        let message = hook
            .create_log_message(&self.metadata)
            .map_err(|source| LogError::MessageConstruction { source })?;
        collect(self.collector.as_ref(), message)
    }
}

/// Logger for one sampled stream.
pub struct StreamLogger<S> {
    source: S,
    bindings: Vec<StreamBinding>,
    metrics: Option<Metrics>,
}

impl<S: StreamLogSource> StreamLogger<S> {
    /// Create a stream logger delivering through `binding`.
    #[must_use]
    pub fn new(source: S, binding: StreamBinding) -> Self {
        Self {
            source,
            bindings: vec![binding],
            metrics: None,
        }
    }

    /// Report failures to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Deliver every unit through an additional binding as well.
    pub fn attach(&mut self, binding: StreamBinding) {
        self.bindings.push(binding);
    }

    /// Bindings this stream delivers through, in attachment order.
    #[must_use]
    pub fn bindings(&self) -> &[StreamBinding] {
        &self.bindings
    }

    /// Per-stream hook.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the per-stream hook, used to record stream state.
    pub const fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the logger and return the per-stream hook.
    #[must_use]
    pub fn into_source(self) -> S {
        self.source
    }

    /// Log the current stream unit through every binding.
    ///
    /// Every binding is attempted; with a single binding the call either fully
    /// succeeds or fails at exactly one stage.
    ///
    /// # Errors
    ///
    /// Returns the first failure: [`LogError::MessageConstruction`] when the hook fails
    /// (that binding's collector is not called) or [`LogError::Collection`] when a
    /// collector rejects the message.
    pub fn log_message(&self) -> LogResult<()> {
        let mut first_error = None;
        for binding in &self.bindings {
            let Err(err) = binding.log(&self.source) else {
                continue;
            };
            if let Some(metrics) = &self.metrics {
                metrics.inc_failure(err.stage());
            }
            warn!(
                model = %binding.metadata.model_spec.name,
                stage = err.stage().as_str(),
                error = %err,
                "stream unit logging failed"
            );
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelSpec, RpcKind};
    use anyhow::{anyhow, bail};
    use serde_json::json;
    use std::sync::Mutex;

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

    struct Counter {
        unit: u32,
        fail: bool,
    }

    impl StreamLogSource for Counter {
        fn create_log_message(&self, metadata: &LogMetadata) -> anyhow::Result<LogMessage> {
            if self.fail {
                bail!("Error");
            }
            Ok(LogMessage {
                kind: RpcKind::Predict,
                metadata: metadata.clone(),
                request: json!({ "unit": self.unit }),
                response: json!(null),
            })
        }
    }

    fn metadata(name: &str) -> LogMetadata {
        LogMetadata::for_model(ModelSpec::new(name))
    }

    #[test]
    fn units_reach_collector_in_call_order() {
        let recorder = Arc::new(Recorder::default());
        let mut stream = StreamLogger::new(
            Counter {
                unit: 0,
                fail: false,
            },
            StreamBinding::new(metadata("model"), recorder.clone()),
        );

        for unit in 1..=3 {
            stream.source_mut().unit = unit;
            stream.log_message().expect("unit should be logged");
        }

        let units: Vec<_> = recorder
            .messages
            .lock()
            .expect("recorder lock")
            .iter()
            .map(|message| message.request["unit"].clone())
            .collect();
        assert_eq!(units, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn hook_failure_skips_collector() {
        let recorder = Arc::new(Recorder::default());
        let stream = StreamLogger::new(
            Counter {
                unit: 0,
                fail: true,
            },
            StreamBinding::new(metadata("model"), recorder.clone()),
        );

        let err = stream.log_message().expect_err("hook failure should surface");
        assert!(matches!(err, LogError::MessageConstruction { .. }));
        assert!(err.to_string().contains("Error"));
        assert!(recorder.messages.lock().expect("recorder lock").is_empty());
    }

    #[test]
    fn attached_bindings_receive_their_own_metadata() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let mut stream = StreamLogger::new(
            Counter {
                unit: 1,
                fail: false,
            },
            StreamBinding::new(metadata("first"), first.clone()),
        );
        stream.attach(StreamBinding::new(metadata("second"), second.clone()));

        stream.log_message().expect("unit should be logged");
        assert_eq!(stream.bindings().len(), 2);

        let first = first.messages.lock().expect("recorder lock");
        let second = second.messages.lock().expect("recorder lock");
        assert_eq!(first[0].metadata.model_spec.name, "first");
        assert_eq!(second[0].metadata.model_spec.name, "second");
    }
}

//! Recording collectors and scripted message hooks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail};
use reqlog_core::{
    LogCollector, LogMessage, LogMessageBuilder, LogMetadata, ServingLogBuilder, ServingRequest,
    ServingResponse, StreamLogSource,
};
use serde_json::json;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Collector that keeps every message it accepts.
#[derive(Debug, Default)]
pub struct RecordingCollector {
    messages: Mutex<Vec<LogMessage>>,
}

impl RecordingCollector {
    /// Fresh collector wrapped for sharing with loggers.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Messages accepted so far, in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<LogMessage> {
        lock(&self.messages).clone()
    }

    /// Number of messages accepted so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        lock(&self.messages).len()
    }
}

impl LogCollector for RecordingCollector {
    fn collect_message(&self, message: LogMessage) -> anyhow::Result<()> {
        self.messages
            .lock()
            .map_err(|_| anyhow!("recording collector poisoned"))?
            .push(message);
        Ok(())
    }
}

/// Collector that rejects every message with a fixed error text.
#[derive(Debug)]
pub struct FailingCollector {
    error: String,
    calls: AtomicUsize,
}

impl FailingCollector {
    /// Collector failing with `error`.
    #[must_use]
    pub fn shared(error: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            error: error.into(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of rejected messages.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LogCollector for FailingCollector {
    fn collect_message(&self, _message: LogMessage) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        bail!("{}", self.error)
    }
}

/// Serving builder that records every invocation and can be told to fail.
#[derive(Debug, Default)]
pub struct ScriptedBuilder {
    failure: Option<String>,
    seen: Mutex<Vec<LogMetadata>>,
}

impl ScriptedBuilder {
    /// Builder delegating to [`ServingLogBuilder`].
    #[must_use]
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Builder failing with `error` on every call.
    #[must_use]
    pub fn failing(error: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(error.into()),
            seen: Mutex::default(),
        })
    }

    /// Number of construction attempts.
    #[must_use]
    pub fn calls(&self) -> usize {
        lock(&self.seen).len()
    }

    /// Metadata passed to each construction attempt.
    #[must_use]
    pub fn seen_metadata(&self) -> Vec<LogMetadata> {
        lock(&self.seen).clone()
    }
}

impl LogMessageBuilder for ScriptedBuilder {
    type Request = ServingRequest;
    type Response = ServingResponse;

    fn create_log_message(
        &self,
        request: &ServingRequest,
        response: &ServingResponse,
        metadata: &LogMetadata,
    ) -> anyhow::Result<LogMessage> {
        lock(&self.seen).push(metadata.clone());
        if let Some(error) = &self.failure {
            bail!("{error}");
        }
        ServingLogBuilder.create_log_message(request, response, metadata)
    }
}

/// Handle observing a [`ScriptedStreamSource`] after it moved into a stream logger.
#[derive(Debug, Clone, Default)]
pub struct StreamTracker {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<LogMetadata>>>,
}

impl StreamTracker {
    /// Number of construction attempts.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Metadata passed to each construction attempt.
    #[must_use]
    pub fn seen_metadata(&self) -> Vec<LogMetadata> {
        lock(&self.seen).clone()
    }
}

/// Stream hook that emits a numbered unit per call and can be told to fail.
#[derive(Debug, Default)]
pub struct ScriptedStreamSource {
    failure: Option<String>,
    tracker: StreamTracker,
}

impl ScriptedStreamSource {
    /// Source producing one predict message per unit.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Source failing with `error` on every unit.
    #[must_use]
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            failure: Some(error.into()),
            tracker: StreamTracker::default(),
        }
    }

    /// Tracker sharing this source's counters.
    #[must_use]
    pub fn tracker(&self) -> StreamTracker {
        self.tracker.clone()
    }
}

impl StreamLogSource for ScriptedStreamSource {
    fn create_log_message(&self, metadata: &LogMetadata) -> anyhow::Result<LogMessage> {
        let unit = self.tracker.calls.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.tracker.seen).push(metadata.clone());
        if let Some(error) = &self.failure {
            bail!("{error}");
        }
        Ok(LogMessage {
            kind: reqlog_core::RpcKind::Predict,
            metadata: metadata.clone(),
            request: json!({ "unit": unit }),
            response: json!({ "unit": unit }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{partial_metadata, predict_request, predict_response};

    #[test]
    fn failing_collector_reports_its_text() {
        let collector = FailingCollector::shared("disk full");
        let message = ScriptedStreamSource::succeeding()
            .create_log_message(&partial_metadata("model", 1))
            .expect("scripted source succeeds");
        let err = collector
            .collect_message(message)
            .expect_err("collector should fail");
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(collector.calls(), 1);
    }

    #[test]
    fn scripted_builder_records_metadata_even_when_failing() {
        let builder = ScriptedBuilder::failing("Error");
        let metadata = partial_metadata("model", 1);
        let result =
            builder.create_log_message(&predict_request("model", 1), &predict_response(), &metadata);
        assert!(result.is_err());
        assert_eq!(builder.seen_metadata(), vec![metadata]);
    }

    #[test]
    fn stream_tracker_outlives_source() {
        let source = ScriptedStreamSource::succeeding();
        let tracker = source.tracker();
        let message = source
            .create_log_message(&partial_metadata("model", 1))
            .expect("scripted source succeeds");
        drop(source);
        assert_eq!(message.request, json!({"unit": 1}));
        assert_eq!(tracker.calls(), 1);
    }
}

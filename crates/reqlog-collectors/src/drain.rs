//! Background task moving queued envelopes into a sink.
//!
//! # Design
//! - Sink failures are logged and counted, never retried; the envelope is dropped.
//! - The task ends once every collector handle is gone and the queue is empty, then
//!   flushes the sink a final time.

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::LogReceiver;
use crate::sink::LogSink;

/// Outcome of a finished drain task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Envelopes the sink accepted.
    pub written: u64,
    /// Envelopes the sink rejected.
    pub failed: u64,
    /// Whether the final flush succeeded.
    pub flushed: bool,
}

/// Drain `receiver` into `sink` until the queue closes.
pub async fn drain<S: LogSink + ?Sized>(mut receiver: LogReceiver, sink: &mut S) -> DrainReport {
    let mut report = DrainReport::default();
    while let Some(envelope) = receiver.recv().await {
        match sink.write(&envelope).await {
            Ok(()) => report.written += 1,
            Err(err) => {
                report.failed += 1;
                warn!(id = envelope.id, error = %err, "failed to write log envelope");
            }
        }
    }

    match sink.flush().await {
        Ok(()) => report.flushed = true,
        Err(err) => warn!(error = %err, "failed to flush log sink"),
    }
    debug!(
        written = report.written,
        failed = report.failed,
        "log collector drained"
    );
    report
}

/// Spawn [`drain`] on the current tokio runtime.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
#[must_use]
pub fn spawn_drain<S>(receiver: LogReceiver, mut sink: S) -> JoinHandle<DrainReport>
where
    S: LogSink + 'static,
{
    tokio::spawn(async move { drain(receiver, &mut sink).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelCollector;
    use crate::envelope::LogEnvelope;
    use crate::error::{CollectorError, CollectorResult};
    use crate::sink::MemorySink;
    use async_trait::async_trait;
    use reqlog_core::{LogCollector, LogMessage, LogMetadata, ModelSpec, RpcKind};
    use serde_json::json;
    use std::num::NonZeroUsize;

    fn message(unit: u32) -> LogMessage {
        LogMessage {
            kind: RpcKind::Predict,
            metadata: LogMetadata::for_model(ModelSpec::new("model")),
            request: json!({ "unit": unit }),
            response: json!(null),
        }
    }

    struct RejectOdd;

    #[async_trait]
    impl LogSink for RejectOdd {
        async fn write(&mut self, envelope: &LogEnvelope) -> CollectorResult<()> {
            if envelope.id % 2 == 1 {
                return Err(CollectorError::Closed);
            }
            Ok(())
        }

        async fn flush(&mut self) -> CollectorResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn drain_writes_everything_then_flushes() {
        let (collector, receiver) = ChannelCollector::new(NonZeroUsize::new(16).expect("capacity"));
        let sink = MemorySink::new();
        let handle = spawn_drain(receiver, sink.clone());

        for unit in 0..5 {
            collector.collect_message(message(unit)).expect("queued");
        }
        drop(collector);

        let report = handle.await.expect("drain task");
        assert_eq!(
            report,
            DrainReport {
                written: 5,
                failed: 0,
                flushed: true
            }
        );
        let ids: Vec<_> = sink.envelopes().iter().map(|envelope| envelope.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(sink.flushes(), 1);
    }

    #[tokio::test]
    async fn sink_errors_are_counted_not_retried() {
        let (collector, receiver) = ChannelCollector::new(NonZeroUsize::new(16).expect("capacity"));
        for unit in 0..4 {
            collector.collect_message(message(unit)).expect("queued");
        }
        drop(collector);

        let report = drain(receiver, &mut RejectOdd).await;
        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 2);
        assert!(report.flushed);
    }
}

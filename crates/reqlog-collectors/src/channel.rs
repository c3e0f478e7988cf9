//! Bounded queue collector used on the serving path.
//!
//! # Design
//! - `collect_message` never blocks: a full queue is reported to the caller instead of
//!   applying backpressure to the served call.
//! - `Ok(())` means the message was accepted for delivery; persistence happens on the
//!   drain task.
//! - Identifiers are assigned before enqueueing, so a rejected message leaves a gap.
//! - The shared queue depth gauge is adjusted by deltas so several collectors can report
//!   into one registry; a dropped receiver subtracts whatever it still held.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqlog_core::{LogCollector, LogMessage};
use reqlog_telemetry::Metrics;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::trace;

use crate::envelope::{EnvelopeId, LogEnvelope};
use crate::error::CollectorError;

/// Collector that queues messages for a background drain task.
#[derive(Clone)]
pub struct ChannelCollector {
    sender: Sender<LogEnvelope>,
    next_id: Arc<AtomicU64>,
    metrics: Option<Metrics>,
}

/// Receiving half of a [`ChannelCollector`] queue.
pub struct LogReceiver {
    receiver: Receiver<LogEnvelope>,
    metrics: Option<Metrics>,
}

impl ChannelCollector {
    /// Create a collector whose queue holds at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> (Self, LogReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.get());
        (
            Self {
                sender,
                next_id: Arc::new(AtomicU64::new(1)),
                metrics: None,
            },
            LogReceiver {
                receiver,
                metrics: None,
            },
        )
    }

    /// Create a collector and receiver that report queue depth to `metrics`.
    #[must_use]
    pub fn with_metrics(capacity: NonZeroUsize, metrics: &Metrics) -> (Self, LogReceiver) {
        let (mut collector, mut receiver) = Self::new(capacity);
        collector.metrics = Some(metrics.clone());
        receiver.metrics = Some(metrics.clone());
        (collector, receiver)
    }

    /// Messages currently waiting in the queue.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Whether the drain side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queue `message` and return the identifier of its envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::QueueFull`] when no slot is free and
    /// [`CollectorError::Closed`] when the receiver is gone.
    pub fn enqueue(&self, message: LogMessage) -> Result<EnvelopeId, CollectorError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // Counted before the send so a fast receiver never drives the gauge negative.
        if let Some(metrics) = &self.metrics {
            metrics.queue_enqueued();
        }
        let result = self.sender.try_send(LogEnvelope::new(id, message));
        if result.is_err() {
            report_dequeued(self.metrics.as_ref(), 1);
        }
        match result {
            Ok(()) => {
                trace!(id, depth = self.queue_depth(), "log message queued");
                Ok(id)
            }
            Err(TrySendError::Full(_)) => Err(CollectorError::QueueFull {
                capacity: self.sender.max_capacity(),
            }),
            Err(TrySendError::Closed(_)) => Err(CollectorError::Closed),
        }
    }
}

impl LogCollector for ChannelCollector {
    fn collect_message(&self, message: LogMessage) -> anyhow::Result<()> {
        self.enqueue(message)?;
        Ok(())
    }
}

impl LogReceiver {
    /// Wait for the next queued envelope; `None` once every collector handle is dropped
    /// and the queue is empty.
    pub async fn recv(&mut self) -> Option<LogEnvelope> {
        let envelope = self.receiver.recv().await;
        if envelope.is_some() {
            report_dequeued(self.metrics.as_ref(), 1);
        }
        envelope
    }

    /// Take the next envelope if one is already queued.
    pub fn try_recv(&mut self) -> Option<LogEnvelope> {
        let envelope = self.receiver.try_recv().ok();
        if envelope.is_some() {
            report_dequeued(self.metrics.as_ref(), 1);
        }
        envelope
    }

    /// Stop accepting new messages; queued envelopes can still be received.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Drop for LogReceiver {
    fn drop(&mut self) {
        if self.metrics.is_none() {
            return;
        }
        self.receiver.close();
        let mut discarded = 0;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        report_dequeued(self.metrics.as_ref(), discarded);
    }
}

fn report_dequeued(metrics: Option<&Metrics>, count: usize) {
    if count > 0
        && let Some(metrics) = metrics
    {
        metrics.queue_dequeued(count);
    }
}

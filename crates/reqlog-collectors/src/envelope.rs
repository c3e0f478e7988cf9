//! Sequenced wrapper around queued log messages.

use chrono::{DateTime, Utc};
use reqlog_core::LogMessage;
use serde::{Deserialize, Serialize};

/// Identifier assigned to each message accepted by a collector.
pub type EnvelopeId = u64;

/// Metadata wrapper around a log message. Each envelope tracks the acceptance
/// order and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEnvelope {
    /// Sequential identifier, starting at 1 per collector.
    pub id: EnvelopeId,
    /// Time the collector accepted the message.
    pub timestamp: DateTime<Utc>,
    /// The message as produced by the logger.
    pub message: LogMessage,
}

impl LogEnvelope {
    /// Wrap `message`, stamping it with the current time.
    #[must_use]
    pub fn new(id: EnvelopeId, message: LogMessage) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            message,
        }
    }
}

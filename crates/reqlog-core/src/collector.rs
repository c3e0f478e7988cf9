//! Sink capability consumed by request and stream loggers.

use crate::model::LogMessage;

/// Opaque sink that accepts assembled log messages.
///
/// Implementations are shared by every logger configured with them and must tolerate
/// concurrent calls. `Ok(())` means the message was accepted for delivery; whether it
/// was durably stored is the collector's business. Loggers never retry a failed call.
pub trait LogCollector: Send + Sync {
    /// Accept one message.
    ///
    /// # Errors
    ///
    /// Returns an error when the sink rejects the message. The error text is
    /// surfaced unchanged to the logging caller.
    fn collect_message(&self, message: LogMessage) -> anyhow::Result<()>;
}

/// Collector that accepts and drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardCollector;

impl LogCollector for DiscardCollector {
    fn collect_message(&self, message: LogMessage) -> anyhow::Result<()> {
        tracing::trace!(kind = message.kind.as_str(), "discarding log message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogMetadata, RpcKind};
    use serde_json::Value;
    use std::sync::Arc;

    #[test]
    fn discard_collector_accepts_through_trait_object() {
        let collector: Arc<dyn LogCollector> = Arc::new(DiscardCollector);
        let message = LogMessage {
            kind: RpcKind::Predict,
            metadata: LogMetadata::default(),
            request: Value::Null,
            response: Value::Null,
        };
        assert!(collector.collect_message(message).is_ok());
    }
}

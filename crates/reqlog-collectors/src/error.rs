//! Error types for collectors and sinks.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while queueing or persisting log messages.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The bounded queue has no free slot.
    #[error("log collector queue is full")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
    /// The drain side of the queue is gone.
    #[error("log collector is closed")]
    Closed,
    /// Envelope could not be encoded as JSON.
    #[error("failed to encode log envelope")]
    Encode {
        /// Source serialization error.
        source: serde_json::Error,
    },
    /// Sink file operation failed.
    #[error("log sink {operation} failed for {}", path.display())]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File the sink writes to.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}

/// Convenience alias for collector results.
pub type CollectorResult<T> = Result<T, CollectorError>;

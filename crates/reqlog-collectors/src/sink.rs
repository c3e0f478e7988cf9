//! Destinations drained envelopes are written to.
//!
//! # Design
//! - Sinks are owned by a single drain task, hence `&mut self` and no internal locking
//!   in the file sink.
//! - Writes may be buffered; [`LogSink::flush`] makes them durable.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::envelope::LogEnvelope;
use crate::error::{CollectorError, CollectorResult};

#[async_trait]
/// Destination for drained log envelopes.
pub trait LogSink: Send {
    /// Write one envelope.
    async fn write(&mut self, envelope: &LogEnvelope) -> CollectorResult<()>;
    /// Persist everything written so far.
    async fn flush(&mut self) -> CollectorResult<()>;
}

/// Appends one JSON object per line to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it and its parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Io`] when the directory or file cannot be created.
    pub async fn create(path: impl AsRef<Path>) -> CollectorResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error("create_dir", &path, source))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| io_error("open", &path, source))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// File this sink appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LogSink for JsonLinesSink {
    async fn write(&mut self, envelope: &LogEnvelope) -> CollectorResult<()> {
        let mut line =
            serde_json::to_vec(envelope).map_err(|source| CollectorError::Encode { source })?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|source| io_error("write", &self.path, source))
    }

    async fn flush(&mut self) -> CollectorResult<()> {
        self.writer
            .flush()
            .await
            .map_err(|source| io_error("flush", &self.path, source))
    }
}

fn io_error(operation: &'static str, path: &Path, source: std::io::Error) -> CollectorError {
    CollectorError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}

/// Keeps envelopes in memory; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    envelopes: Arc<Mutex<Vec<LogEnvelope>>>,
    flushes: Arc<Mutex<usize>>,
}

impl MemorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelopes written so far, in write order.
    #[must_use]
    pub fn envelopes(&self) -> Vec<LogEnvelope> {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of flushes requested so far.
    #[must_use]
    pub fn flushes(&self) -> usize {
        *self.flushes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn write(&mut self, envelope: &LogEnvelope) -> CollectorResult<()> {
        self.envelopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());
        Ok(())
    }

    async fn flush(&mut self) -> CollectorResult<()> {
        *self.flushes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqlog_core::{LogMessage, LogMetadata, ModelSpec, RpcKind};
    use serde_json::json;

    fn envelope(id: u64) -> LogEnvelope {
        LogEnvelope::new(
            id,
            LogMessage {
                kind: RpcKind::Classify,
                metadata: LogMetadata::for_model(ModelSpec::new("model")),
                request: json!({ "id": id }),
                response: json!({ "label": "cat" }),
            },
        )
    }

    #[tokio::test]
    async fn json_lines_sink_appends_one_object_per_line() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("requests.1.jsonl");

        let mut sink = JsonLinesSink::create(&path).await?;
        sink.write(&envelope(1)).await?;
        sink.write(&envelope(2)).await?;
        sink.flush().await?;
        drop(sink);

        let mut sink = JsonLinesSink::create(&path).await?;
        sink.write(&envelope(3)).await?;
        sink.flush().await?;

        let raw = tokio::fs::read_to_string(&path).await?;
        let ids: Vec<u64> = raw
            .lines()
            .map(|line| serde_json::from_str::<LogEnvelope>(line).map(|envelope| envelope.id))
            .collect::<Result<_, _>>()?;
        assert_eq!(ids, vec![1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn memory_sink_clones_share_storage() -> anyhow::Result<()> {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write(&envelope(7)).await?;
        writer.flush().await?;
        assert_eq!(sink.envelopes()[0].id, 7);
        assert_eq!(sink.flushes(), 1);
        Ok(())
    }
}

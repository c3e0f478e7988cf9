//! # Design
//!
//! - Collector types are registered once at startup; lookups afterwards are read-only.
//! - Every created collector gets a fresh identifier so file-backed collectors never
//!   share an output file within one process.
//! - Drain tasks spawned by factories are tracked so shutdown can wait for them.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, bail};
use reqlog_collectors::{ChannelCollector, DrainReport, JsonLinesSink, LogReceiver, drain};
use reqlog_config::LogCollectorConfig;
use reqlog_core::{DiscardCollector, LogCollector};
use reqlog_telemetry::Metrics;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{ServerError, ServerResult};

/// Unique identifier handed to collector factories.
pub type CollectorId = u64;

/// Builds a collector for one logger configuration.
pub type CollectorFactory = Arc<
    dyn Fn(&LogCollectorConfig, CollectorId) -> anyhow::Result<Arc<dyn LogCollector>>
        + Send
        + Sync,
>;

/// Collector type writing JSON lines through a background drain task.
pub const JSONL_COLLECTOR: &str = "jsonl";
/// Collector type accepting and dropping every message.
pub const DISCARD_COLLECTOR: &str = "discard";

type DrainHandles = Arc<Mutex<Vec<JoinHandle<DrainReport>>>>;

/// Wrap a closure as a [`CollectorFactory`].
pub fn collector_factory<F>(factory: F) -> CollectorFactory
where
    F: Fn(&LogCollectorConfig, CollectorId) -> anyhow::Result<Arc<dyn LogCollector>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(factory)
}

/// Collector factories keyed by collector type.
pub struct CollectorRegistry {
    factories: HashMap<String, CollectorFactory>,
    next_id: AtomicU64,
    drains: DrainHandles,
}

impl CollectorRegistry {
    /// Registry without any collector types.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            next_id: AtomicU64::new(1),
            drains: Arc::default(),
        }
    }

    /// Registry with the built-in `jsonl` and `discard` collector types.
    ///
    /// `jsonl` collectors queue up to `queue_capacity` messages and write them to
    /// `<filename_prefix>.<id>.jsonl`.
    #[must_use]
    pub fn with_defaults(queue_capacity: NonZeroUsize, metrics: Option<Metrics>) -> Self {
        let mut registry = Self::new();
        let drains = Arc::clone(&registry.drains);
        let jsonl = collector_factory(move |config, id| {
            jsonl_collector(config, id, queue_capacity, metrics.as_ref(), &drains)
        });
        let discard = collector_factory(|_, _| Ok(Arc::new(DiscardCollector)));
        registry.factories.insert(JSONL_COLLECTOR.to_string(), jsonl);
        registry
            .factories
            .insert(DISCARD_COLLECTOR.to_string(), discard);
        registry
    }

    /// Register `factory` for `collector_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::DuplicateCollectorType`] when the type is already registered.
    pub fn register(
        &mut self,
        collector_type: impl Into<String>,
        factory: CollectorFactory,
    ) -> ServerResult<()> {
        let collector_type = collector_type.into();
        if self.factories.contains_key(&collector_type) {
            return Err(ServerError::DuplicateCollectorType { collector_type });
        }
        self.factories.insert(collector_type, factory);
        Ok(())
    }

    /// Whether a factory is registered for `collector_type`.
    #[must_use]
    pub fn contains(&self, collector_type: &str) -> bool {
        self.factories.contains_key(collector_type)
    }

    /// Build a collector for `config` with a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::UnknownCollectorType`] for an unregistered type and
    /// [`ServerError::CollectorConstruction`] when the factory fails.
    pub fn create(&self, config: &LogCollectorConfig) -> ServerResult<Arc<dyn LogCollector>> {
        let factory = self.factories.get(&config.collector_type).ok_or_else(|| {
            ServerError::UnknownCollectorType {
                collector_type: config.collector_type.clone(),
            }
        })?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let collector = factory(config, id).map_err(|source| ServerError::CollectorConstruction {
            collector_type: config.collector_type.clone(),
            source,
        })?;
        info!(
            collector_type = %config.collector_type,
            id,
            "log collector created"
        );
        Ok(collector)
    }

    /// Take the drain tasks spawned so far.
    ///
    /// Each task finishes once every logger holding its collector is dropped.
    #[must_use]
    pub fn take_drains(&self) -> Vec<JoinHandle<DrainReport>> {
        std::mem::take(&mut *self.drains.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn jsonl_collector(
    config: &LogCollectorConfig,
    id: CollectorId,
    queue_capacity: NonZeroUsize,
    metrics: Option<&Metrics>,
    drains: &DrainHandles,
) -> anyhow::Result<Arc<dyn LogCollector>> {
    if config.filename_prefix.trim().is_empty() {
        bail!("jsonl collector requires a filename_prefix");
    }
    let runtime = Handle::try_current().context("jsonl collector requires a tokio runtime")?;
    let (collector, receiver) = match metrics {
        Some(metrics) => ChannelCollector::with_metrics(queue_capacity, metrics),
        None => ChannelCollector::new(queue_capacity),
    };
    let path = format!("{}.{id}.jsonl", config.filename_prefix);
    let handle = runtime.spawn(drain_to_file(path, receiver));
    drains
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(handle);
    Ok(Arc::new(collector))
}

async fn drain_to_file(path: String, receiver: LogReceiver) -> DrainReport {
    match JsonLinesSink::create(&path).await {
        Ok(mut sink) => drain(receiver, &mut sink).await,
        Err(err) => {
            warn!(path = %path, error = %err, "failed to open request log file");
            DrainReport::default()
        }
    }
}

//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counter updates are lock-free and safe to call from the serving path.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Stage at which a logging attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The message-construction hook returned an error.
    Construction,
    /// The collector rejected the assembled message.
    Collection,
}

impl FailureStage {
    /// Label value recorded on the failure counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::Collection => "collection",
        }
    }
}

/// Prometheus-backed metrics registry shared across loggers.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    sampled_total: IntCounterVec,
    skipped_total: IntCounter,
    failures_total: IntCounterVec,
    streams_started_total: IntCounter,
    collector_queue_depth: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Calls and streams not selected by sampling.
    pub skipped_total: u64,
    /// Logging attempts that failed while building the message.
    pub construction_failures_total: u64,
    /// Logging attempts rejected by a collector.
    pub collection_failures_total: u64,
    /// Stream loggers handed out to streaming calls.
    pub streams_started_total: u64,
    /// Messages waiting across every collector queue.
    pub collector_queue_depth: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let sampled_total = IntCounterVec::new(
            Opts::new(
                "request_log_sampled_total",
                "Calls and streams selected for request logging, by model",
            ),
            &["model"],
        )
        .map_err(|source| TelemetryError::Metric {
            operation: "build",
            name: "request_log_sampled_total",
            source,
        })?;
        let skipped_total = IntCounter::with_opts(Opts::new(
            "request_log_skipped_total",
            "Calls and streams skipped by request log sampling",
        ))
        .map_err(|source| TelemetryError::Metric {
            operation: "build",
            name: "request_log_skipped_total",
            source,
        })?;
        let failures_total = IntCounterVec::new(
            Opts::new(
                "request_log_failures_total",
                "Request logging failures by stage",
            ),
            &["stage"],
        )
        .map_err(|source| TelemetryError::Metric {
            operation: "build",
            name: "request_log_failures_total",
            source,
        })?;
        let streams_started_total = IntCounter::with_opts(Opts::new(
            "stream_loggers_started_total",
            "Stream loggers created for sampled streaming calls",
        ))
        .map_err(|source| TelemetryError::Metric {
            operation: "build",
            name: "stream_loggers_started_total",
            source,
        })?;
        let collector_queue_depth = IntGauge::with_opts(Opts::new(
            "collector_queue_depth",
            "Messages queued across every collector and not yet drained",
        ))
        .map_err(|source| TelemetryError::Metric {
            operation: "build",
            name: "collector_queue_depth",
            source,
        })?;

        register(&registry, "request_log_sampled_total", &sampled_total)?;
        register(&registry, "request_log_skipped_total", &skipped_total)?;
        register(&registry, "request_log_failures_total", &failures_total)?;
        register(&registry, "stream_loggers_started_total", &streams_started_total)?;
        register(&registry, "collector_queue_depth", &collector_queue_depth)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                sampled_total,
                skipped_total,
                failures_total,
                streams_started_total,
                collector_queue_depth,
            }),
        })
    }

    /// Increment the sampled counter for the given model.
    pub fn inc_sampled(&self, model: &str) {
        self.inner.sampled_total.with_label_values(&[model]).inc();
    }

    /// Increment the counter of calls skipped by sampling.
    pub fn inc_skipped(&self) {
        self.inner.skipped_total.inc();
    }

    /// Increment the failure counter for the given stage.
    pub fn inc_failure(&self, stage: FailureStage) {
        self.inner
            .failures_total
            .with_label_values(&[stage.as_str()])
            .inc();
    }

    /// Increment the counter of stream loggers handed out.
    pub fn inc_stream_started(&self) {
        self.inner.streams_started_total.inc();
    }

    /// Record messages entering a collector queue.
    pub fn queue_enqueued(&self) {
        self.inner.collector_queue_depth.inc();
    }

    /// Record messages leaving a collector queue, delivered or discarded.
    pub fn queue_dequeued(&self, count: usize) {
        self.inner
            .collector_queue_depth
            .sub(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Current value of the sampled counter for a model.
    #[must_use]
    pub fn sampled_for(&self, model: &str) -> u64 {
        self.inner.sampled_total.with_label_values(&[model]).get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Render { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::RenderUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let failures = |stage: FailureStage| {
            self.inner
                .failures_total
                .with_label_values(&[stage.as_str()])
                .get()
        };
        MetricsSnapshot {
            skipped_total: self.inner.skipped_total.get(),
            construction_failures_total: failures(FailureStage::Construction),
            collection_failures_total: failures(FailureStage::Collection),
            streams_started_total: self.inner.streams_started_total.get(),
            collector_queue_depth: self.inner.collector_queue_depth.get(),
        }
    }
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Metric {
            operation: "register",
            name,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_sampled("resnet");
        metrics.inc_sampled("resnet");
        metrics.inc_sampled("bert");
        metrics.inc_skipped();
        metrics.inc_failure(FailureStage::Construction);
        metrics.inc_failure(FailureStage::Collection);
        metrics.inc_failure(FailureStage::Collection);
        metrics.inc_stream_started();
        for _ in 0..9 {
            metrics.queue_enqueued();
        }
        metrics.queue_dequeued(2);

        assert_eq!(metrics.sampled_for("resnet"), 2);
        assert_eq!(metrics.sampled_for("bert"), 1);
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                skipped_total: 1,
                construction_failures_total: 1,
                collection_failures_total: 2,
                streams_started_total: 1,
                collector_queue_depth: 7,
            }
        );

        let rendered = metrics.render()?;
        assert!(rendered.contains("request_log_sampled_total"));
        assert!(rendered.contains("stage=\"collection\""));
        assert!(rendered.contains("collector_queue_depth 7"));
        Ok(())
    }

    #[test]
    fn separate_registries_do_not_share_counters() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_skipped();
        assert_eq!(first.snapshot().skipped_total, 1);
        assert_eq!(second.snapshot().skipped_total, 0);
        Ok(())
    }
}

#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives shared across the reqlog workspace.
//!
//! This crate centralises tracing setup and the Prometheus counters that describe
//! request-logging activity, so every logger reports through the same registry.
//!
//! Layout: `init.rs` (subscriber installation), `metrics.rs` (Prometheus registry),
//! `error.rs` (typed failures).

pub mod error;
pub mod init;
pub mod metrics;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
pub use metrics::{FailureStage, Metrics, MetricsSnapshot};

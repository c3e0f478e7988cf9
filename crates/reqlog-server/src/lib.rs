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

//! Server-wide request logging wiring.
//!
//! Layout: `registry.rs` (collector factories by type), `server_logger.rs` (model
//! routing over per-model request loggers), `bootstrap.rs` (telemetry, registry and
//! logger construction from a serving document).

/// Runtime construction from a serving document.
pub mod bootstrap;
pub mod error;
/// Collector factories keyed by collector type.
pub mod registry;
/// Model routing over per-model request loggers.
pub mod server_logger;

pub use bootstrap::{ServingLogRuntime, init_telemetry};
pub use error::{ServerError, ServerResult};
pub use registry::{
    CollectorFactory, CollectorId, CollectorRegistry, DISCARD_COLLECTOR, JSONL_COLLECTOR,
    collector_factory,
};
pub use server_logger::ServerRequestLogger;

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

//! Sampling request logger for served model calls.
//!
//! A [`RequestLogger`] is created per served model version. It decides per call
//! whether a record should be emitted, assembles the record's metadata, asks a
//! [`LogMessageBuilder`] to build the payload and hands the payload to a
//! [`LogCollector`]. Streaming calls obtain a [`StreamLogger`] once per stream; the
//! stream logger owns its metadata and collector handle and keeps working after the
//! request logger that created it is dropped.
//!
//! Layout: `model.rs` (metadata and message types), `sampling.rs` (sampling decision),
//! `metadata.rs` (metadata assembly), `collector.rs` (sink trait),
//! `request_logger.rs`, `stream_logger.rs`, `apis.rs` (serving request kinds).

pub mod apis;
pub mod collector;
pub mod error;
pub mod metadata;
pub mod model;
pub mod request_logger;
pub mod sampling;
pub mod stream_logger;

pub use apis::{
    CallStreamSource, SerdeLogBuilder, ServingLogBuilder, ServingRequest, ServingResponse,
};
pub use collector::{DiscardCollector, LogCollector};
pub use error::{LogError, LogResult};
pub use metadata::MetadataAssembler;
pub use model::{LogMessage, LogMetadata, ModelSpec, RpcKind, SamplingConfig};
pub use request_logger::{LogMessageBuilder, RequestLogger};
pub use sampling::{should_sample, should_sample_with};
pub use stream_logger::{StreamBinding, StreamLogSource, StreamLogger};

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

//! Concrete log collectors for the request loggers.
//!
//! A [`ChannelCollector`] accepts messages on the serving path without blocking and
//! hands them to a background drain task, which writes them to a [`LogSink`].
//!
//! Layout: `envelope.rs` (sequenced message wrapper), `channel.rs` (bounded queue
//! collector), `sink.rs` (sink trait plus JSON-lines and in-memory sinks), `drain.rs`
//! (background drain task).

pub mod channel;
pub mod drain;
pub mod envelope;
pub mod error;
pub mod sink;

pub use channel::{ChannelCollector, LogReceiver};
pub use drain::{DrainReport, drain, spawn_drain};
pub use envelope::{EnvelopeId, LogEnvelope};
pub use error::{CollectorError, CollectorResult};
pub use sink::{JsonLinesSink, LogSink, MemorySink};

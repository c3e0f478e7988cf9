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

//! Request-logging configuration documents.
//!
//! Layout: `model.rs` (typed config documents), `validate.rs` (field checks),
//! `loader.rs` (JSON parsing from strings and files), `defaults.rs` (fallback values).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_from_path, load_from_str};
pub use model::{LogCollectorConfig, LoggingConfig, ModelLoggingConfigs, ServingLogConfig};
pub use validate::{validate_logging_config, validate_sampling_config, validate_serving_config};

//! Metadata and message types carried by request loggers.
//!
//! # Design
//! - Pure data carriers; nothing in here performs IO or sampling.
//! - [`LogMessage`] is opaque to the loggers: they move it to a collector and never
//!   look inside.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies which model (and optionally which version) served a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    /// Model name as routed by the serving front end.
    pub name: String,
    /// Concrete version that handled the call, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl ModelSpec {
    /// Build a spec for the latest version of `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Pin the spec to a concrete version.
    #[must_use]
    pub const fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }
}

/// Probability with which calls are selected for logging.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SamplingConfig {
    /// Selection probability in `[0, 1]`.
    pub sampling_rate: f64,
}

impl SamplingConfig {
    /// Sampling configuration with the given rate.
    #[must_use]
    pub const fn new(sampling_rate: f64) -> Self {
        Self { sampling_rate }
    }

    /// Log every call.
    #[must_use]
    pub const fn always() -> Self {
        Self::new(1.0)
    }

    /// Log nothing.
    #[must_use]
    pub const fn never() -> Self {
        Self::new(0.0)
    }
}

/// Metadata snapshot recorded alongside every log message.
///
/// The sampling configuration and deployment tags are always the ones configured on
/// the logger that produced the snapshot; see [`crate::MetadataAssembler`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogMetadata {
    /// Model that served the call.
    pub model_spec: ModelSpec,
    /// Sampling configuration in effect when the call was selected.
    #[serde(default)]
    pub sampling_config: SamplingConfig,
    /// Deployment tags (for example `serve`, `tpu`) in configured order, without duplicates.
    #[serde(default)]
    pub deployment_tags: Vec<String>,
}

impl LogMetadata {
    /// Partial metadata carrying only the model identity.
    #[must_use]
    pub fn for_model(model_spec: ModelSpec) -> Self {
        Self {
            model_spec,
            ..Self::default()
        }
    }
}

/// RPC kinds that can produce a log message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RpcKind {
    /// Tensor-in, tensor-out prediction.
    Predict,
    /// Classification over examples.
    Classify,
    /// Regression over examples.
    Regress,
    /// Several inference tasks answered by one call.
    MultiInference,
    /// Raw session run.
    SessionRun,
}

impl RpcKind {
    /// Machine-friendly discriminator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Predict => "predict",
            Self::Classify => "classify",
            Self::Regress => "regress",
            Self::MultiInference => "multi_inference",
            Self::SessionRun => "session_run",
        }
    }
}

/// Opaque log payload handed to a collector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogMessage {
    /// RPC kind that produced the record.
    pub kind: RpcKind,
    /// Metadata assembled by the logger.
    pub metadata: LogMetadata,
    /// Request body, type-erased.
    pub request: Value,
    /// Response body, type-erased.
    pub response: Value,
}

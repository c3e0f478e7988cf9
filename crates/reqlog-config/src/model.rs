//! Typed configuration documents for request logging.
//!
//! # Design
//! - Documents deserialize from JSON with serde defaults for every optional field.
//! - Validation lives in `validate.rs`; these types carry no behavior beyond defaults.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use reqlog_core::SamplingConfig;
use serde::{Deserialize, Serialize};

use crate::defaults;

/// Where and how a logger's messages are delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogCollectorConfig {
    /// Registered collector type, for example `jsonl`.
    #[serde(rename = "type")]
    pub collector_type: String,
    /// Prefix of the files a file-backed collector writes.
    #[serde(default)]
    pub filename_prefix: String,
}

/// Request-logging configuration for one logger of a model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Sampling applied to calls routed to the model.
    #[serde(default)]
    pub sampling_config: SamplingConfig,
    /// Collector receiving the sampled messages.
    pub log_collector_config: LogCollectorConfig,
}

/// Logging configurations keyed by model name.
pub type ModelLoggingConfigs = BTreeMap<String, Vec<LoggingConfig>>;

/// Top-level request-logging document of a serving process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServingLogConfig {
    /// Default tracing filter directive.
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Optional output format (`json` or `pretty`); inferred when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_format: Option<String>,
    /// Deployment tags recorded on every message.
    #[serde(default)]
    pub deployment_tags: Vec<String>,
    /// Capacity of each channel-backed collector queue; zero is rejected while parsing.
    #[serde(default = "defaults::collector_queue_capacity")]
    pub collector_queue_capacity: NonZeroUsize,
    /// Per-model logger configurations.
    #[serde(default)]
    pub models: ModelLoggingConfigs,
}

impl Default for ServingLogConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            log_format: None,
            deployment_tags: Vec::new(),
            collector_queue_capacity: defaults::collector_queue_capacity(),
            models: ModelLoggingConfigs::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_document_uses_defaults() -> serde_json::Result<()> {
        let config: ServingLogConfig = serde_json::from_value(json!({}))?;
        assert_eq!(config, ServingLogConfig::default());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.collector_queue_capacity.get(), 4_096);
        Ok(())
    }

    #[test]
    fn zero_queue_capacity_does_not_parse() {
        let err = serde_json::from_value::<ServingLogConfig>(json!({"collector_queue_capacity": 0}))
            .expect_err("zero capacity should be rejected");
        assert!(err.to_string().contains("nonzero"), "{err}");
    }

    #[test]
    fn collector_type_uses_short_key() -> serde_json::Result<()> {
        let config: LoggingConfig = serde_json::from_value(json!({
            "sampling_config": {"sampling_rate": 0.5},
            "log_collector_config": {"type": "jsonl", "filename_prefix": "/tmp/logs/resnet"}
        }))?;
        assert_eq!(config.log_collector_config.collector_type, "jsonl");
        assert!((config.sampling_config.sampling_rate - 0.5).abs() < f64::EPSILON);
        Ok(())
    }
}

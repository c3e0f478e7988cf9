//! Validation helpers for request-logging documents.
//!
//! # Design
//! - Reject a whole document on the first invalid field; nothing is partially applied.
//! - Section names follow the document path (`models.<name>[<index>]`) so errors point
//!   at the offending entry.

use reqlog_core::SamplingConfig;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{LoggingConfig, ServingLogConfig};

/// Ensure a sampling rate is a finite probability.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the rate is not finite or lies outside `[0, 1]`.
pub fn validate_sampling_config(section: &str, config: &SamplingConfig) -> ConfigResult<()> {
    let rate = config.sampling_rate;
    if !rate.is_finite() {
        return Err(ConfigError::invalid(
            section,
            "sampling_rate",
            Some(rate.to_string()),
            "must be a finite number",
        ));
    }
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::invalid(
            section,
            "sampling_rate",
            Some(rate.to_string()),
            "must be between 0 and 1",
        ));
    }
    Ok(())
}

/// Validate one logger configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for an invalid sampling rate or an empty
/// collector type.
pub fn validate_logging_config(section: &str, config: &LoggingConfig) -> ConfigResult<()> {
    validate_sampling_config(section, &config.sampling_config)?;
    if config.log_collector_config.collector_type.trim().is_empty() {
        return Err(ConfigError::invalid(
            section,
            "type",
            None,
            "collector type must not be empty",
        ));
    }
    Ok(())
}

/// Validate a full serving document.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first invalid field encountered.
pub fn validate_serving_config(config: &ServingLogConfig) -> ConfigResult<()> {
    if config.log_level.trim().is_empty() {
        return Err(ConfigError::invalid(
            "serving",
            "log_level",
            None,
            "must not be empty",
        ));
    }
    if let Some(tag) = config.deployment_tags.iter().find(|tag| tag.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "serving",
            "deployment_tags",
            Some(tag.clone()),
            "tags must not be empty",
        ));
    }
    for (model, configs) in &config.models {
        if model.trim().is_empty() {
            return Err(ConfigError::invalid(
                "models",
                "name",
                Some(model.clone()),
                "model name must not be empty",
            ));
        }
        for (index, logging) in configs.iter().enumerate() {
            validate_logging_config(&format!("models.{model}[{index}]"), logging)?;
        }
    }
    Ok(())
}

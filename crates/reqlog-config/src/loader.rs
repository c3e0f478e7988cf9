//! Load request-logging documents from JSON.
//!
//! # Design
//! - Parse, then validate; callers only ever see validated documents.

use std::path::Path;

use tokio::fs;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::ServingLogConfig;
use crate::validate::validate_serving_config;

/// Parse and validate a serving document from a JSON string.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed JSON and [`ConfigError::InvalidField`]
/// when validation fails.
pub fn load_from_str(raw: &str) -> ConfigResult<ServingLogConfig> {
    let config: ServingLogConfig =
        serde_json::from_str(raw).map_err(|source| ConfigError::Parse { source })?;
    validate_serving_config(&config)?;
    debug!(
        models = config.models.len(),
        tags = config.deployment_tags.len(),
        "logging configuration parsed"
    );
    Ok(config)
}

/// Read, parse and validate a serving document from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read, plus every error of
/// [`load_from_str`].
pub async fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<ServingLogConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let config = load_from_str(&raw)?;
    info!(path = %path.display(), models = config.models.len(), "loaded logging configuration");
    Ok(config)
}

//! Metadata and serving-call fixtures.

use reqlog_core::{LogMetadata, ModelSpec, ServingRequest, ServingResponse};
use serde_json::json;

/// Deployment tags most suites configure their loggers with.
pub const SERVE_TAGS: [&str; 2] = ["serve", "tpu"];

/// Model spec named `name` pinned to `version`.
#[must_use]
pub fn model_spec(name: &str, version: i64) -> ModelSpec {
    ModelSpec::new(name).with_version(version)
}

/// Partial metadata as a serving method would supply it.
#[must_use]
pub fn partial_metadata(name: &str, version: i64) -> LogMetadata {
    LogMetadata::for_model(model_spec(name, version))
}

/// Predict request addressed to `name`/`version`.
#[must_use]
pub fn predict_request(name: &str, version: i64) -> ServingRequest {
    ServingRequest::predict(
        model_spec(name, version),
        json!({"inputs": {"x": [1.0, 2.0]}}),
    )
}

/// Predict response carrying a single output tensor.
#[must_use]
pub fn predict_response() -> ServingResponse {
    ServingResponse::predict(json!({"outputs": {"tensor": [0.5]}}))
}

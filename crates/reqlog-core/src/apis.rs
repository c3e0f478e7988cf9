//! Serving request kinds and the builders that log them.

use std::fmt;
use std::marker::PhantomData;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{LogMessage, LogMetadata, ModelSpec, RpcKind};
use crate::request_logger::LogMessageBuilder;
use crate::stream_logger::StreamLogSource;

/// A request received by one of the serving methods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServingRequest {
    /// Serving method the request was sent to.
    pub kind: RpcKind,
    /// Model the caller addressed.
    pub model_spec: ModelSpec,
    /// Method-specific request body.
    pub body: Value,
}

/// A response produced by one of the serving methods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServingResponse {
    /// Serving method that produced the response.
    pub kind: RpcKind,
    /// Method-specific response body.
    pub body: Value,
}

impl ServingRequest {
    /// Predict request for `model_spec`.
    #[must_use]
    pub const fn predict(model_spec: ModelSpec, body: Value) -> Self {
        Self {
            kind: RpcKind::Predict,
            model_spec,
            body,
        }
    }
}

impl ServingResponse {
    /// Predict response.
    #[must_use]
    pub const fn predict(body: Value) -> Self {
        Self {
            kind: RpcKind::Predict,
            body,
        }
    }
}

/// Builder for [`ServingRequest`]/[`ServingResponse`] pairs of any kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServingLogBuilder;

impl LogMessageBuilder for ServingLogBuilder {
    type Request = ServingRequest;
    type Response = ServingResponse;

    fn create_log_message(
        &self,
        request: &ServingRequest,
        response: &ServingResponse,
        metadata: &LogMetadata,
    ) -> anyhow::Result<LogMessage> {
        if request.kind != response.kind {
            bail!(
                "unsupported request/response pairing: {} request with {} response",
                request.kind.as_str(),
                response.kind.as_str()
            );
        }
        Ok(LogMessage {
            kind: request.kind,
            metadata: metadata.clone(),
            request: request.body.clone(),
            response: response.body.clone(),
        })
    }
}

/// Builder for strongly typed request/response pairs of a single kind.
///
/// Both values are serialized to JSON; a serialization failure is reported as a
/// construction failure.
pub struct SerdeLogBuilder<Req: ?Sized, Resp: ?Sized> {
    kind: RpcKind,
    _marker: PhantomData<fn(&Req, &Resp)>,
}

impl<Req: ?Sized, Resp: ?Sized> SerdeLogBuilder<Req, Resp> {
    /// Builder tagging every message with `kind`.
    #[must_use]
    pub const fn new(kind: RpcKind) -> Self {
        Self {
            kind,
            _marker: PhantomData,
        }
    }
}

impl<Req: ?Sized, Resp: ?Sized> fmt::Debug for SerdeLogBuilder<Req, Resp> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SerdeLogBuilder")
            .field("kind", &self.kind)
            .finish()
    }
}

impl<Req, Resp> LogMessageBuilder for SerdeLogBuilder<Req, Resp>
where
    Req: Serialize + ?Sized,
    Resp: Serialize + ?Sized,
{
    type Request = Req;
    type Response = Resp;

    fn create_log_message(
        &self,
        request: &Req,
        response: &Resp,
        metadata: &LogMetadata,
    ) -> anyhow::Result<LogMessage> {
        Ok(LogMessage {
            kind: self.kind,
            metadata: metadata.clone(),
            request: serde_json::to_value(request).context("failed to serialize request")?,
            response: serde_json::to_value(response).context("failed to serialize response")?,
        })
    }
}

/// Per-stream hook for streamed serving calls.
///
/// Records the latest request and response of the stream; each logged unit carries
/// whatever was recorded last.
#[derive(Debug, Clone, Default)]
pub struct CallStreamSource {
    request: Option<ServingRequest>,
    response: Option<ServingResponse>,
    units: u64,
}

impl CallStreamSource {
    /// Empty stream state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the request of the current unit.
    pub fn record_request(&mut self, request: ServingRequest) {
        self.units = self.units.saturating_add(1);
        self.request = Some(request);
        self.response = None;
    }

    /// Record the response of the current unit.
    pub fn record_response(&mut self, response: ServingResponse) {
        self.response = Some(response);
    }

    /// Number of requests recorded on this stream so far.
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.units
    }
}

impl StreamLogSource for CallStreamSource {
    fn create_log_message(&self, metadata: &LogMetadata) -> anyhow::Result<LogMessage> {
        let Some(request) = &self.request else {
            bail!("no stream request recorded");
        };
        if let Some(response) = &self.response
            && response.kind != request.kind
        {
            bail!(
                "unsupported request/response pairing: {} request with {} response",
                request.kind.as_str(),
                response.kind.as_str()
            );
        }
        Ok(LogMessage {
            kind: request.kind,
            metadata: metadata.clone(),
            request: request.body.clone(),
            response: self
                .response
                .as_ref()
                .map_or(Value::Null, |response| response.body.clone()),
        })
    }
}

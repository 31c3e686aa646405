//! Vendor adapters behind one polymorphic interface
//!
//! An adapter is pure: it builds wire requests and parses wire bodies, and
//! never performs I/O. `build_adapter` is the only place vendor identity is
//! inspected; everything above works against `dyn ProviderAdapter`.

pub mod anthropic;
pub mod google;
pub mod openai;

use std::sync::Arc;

use chorus_config::{ProviderConfig, ProviderKind};
use http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use http::{HeaderMap, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use self::anthropic::AnthropicAdapter;
use self::google::GoogleAdapter;
use self::openai::{OpenAiAdapter, OpenAiDialect};
use crate::error::LlmError;
use crate::sse::FrameMode;
use crate::types::{Completion, GenerationSettings, Message, StreamDelta};

/// Features a vendor offers for a given model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Whether the model accepts streaming requests
    pub streaming: bool,
}

/// Vendor-ready HTTP request
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Endpoint to POST to
    pub url: Url,
    /// Authentication and vendor headers
    pub headers: HeaderMap,
    /// JSON body
    pub body: serde_json::Value,
}

/// Trait implemented by each vendor
pub trait ProviderAdapter: Send + Sync {
    /// Configuration label of this target
    fn name(&self) -> &str;

    /// Vendor family
    fn kind(&self) -> ProviderKind;

    /// Advertised capabilities for a model
    fn capabilities(&self, model: &str) -> ProviderCapabilities;

    /// How this vendor's event stream is framed
    fn frame_mode(&self) -> FrameMode {
        FrameMode::Strict
    }

    /// Build a request from the canonical history
    ///
    /// The history is only read; reasoning messages are never sent.
    fn build_request(
        &self,
        history: &[Message],
        settings: &GenerationSettings,
        model: &str,
        stream: bool,
    ) -> Result<WireRequest, LlmError>;

    /// Parse one stream payload into zero or more deltas
    ///
    /// Payloads that do not decode are skipped; an in-stream error envelope
    /// is returned as an error.
    fn parse_stream_chunk(&self, payload: &str) -> Result<Vec<StreamDelta>, LlmError>;

    /// Parse a complete non-streaming body
    fn parse_full_response(&self, body: &str) -> Result<Completion, LlmError>;

    /// Convert a non-success response into the canonical taxonomy
    fn parse_error(&self, status: StatusCode, headers: &HeaderMap, body: &str) -> LlmError {
        let message = error_message(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_owned()
            } else {
                trimmed.to_owned()
            }
        });
        LlmError::from_status(status, retry_after(headers), message)
    }
}

/// Construct the adapter for a configured target
///
/// # Errors
///
/// Returns `NoApiService` when the target lacks a setting its vendor
/// requires
pub fn build_adapter(label: &str, config: &ProviderConfig) -> Result<Arc<dyn ProviderAdapter>, LlmError> {
    if config.model.trim().is_empty() {
        return Err(LlmError::NoApiService(format!("target '{label}' has no model")));
    }

    let api_key = config
        .api_key
        .as_ref()
        .map(|key| key.expose_secret().trim().to_owned())
        .filter(|key| !key.is_empty());
    if config.kind.requires_api_key() && api_key.is_none() {
        return Err(LlmError::NoApiService(format!("target '{label}' has no API key")));
    }

    let base_url = config.base_url.clone();
    let adapter: Arc<dyn ProviderAdapter> = match config.kind {
        ProviderKind::Openai => Arc::new(OpenAiAdapter::new(label, OpenAiDialect::OpenAi, base_url, api_key)?),
        ProviderKind::Deepseek => Arc::new(OpenAiAdapter::new(label, OpenAiDialect::Deepseek, base_url, api_key)?),
        ProviderKind::Openrouter => Arc::new(OpenAiAdapter::new(label, OpenAiDialect::Openrouter, base_url, api_key)?),
        ProviderKind::OpenaiCompatible => {
            let Some(base_url) = base_url else {
                return Err(LlmError::NoApiService(format!("target '{label}' has no base_url")));
            };
            Arc::new(OpenAiAdapter::new(label, OpenAiDialect::Compatible, Some(base_url), api_key)?)
        }
        ProviderKind::Anthropic => Arc::new(AnthropicAdapter::new(label, base_url, api_key)?),
        ProviderKind::Google => Arc::new(GoogleAdapter::new(label, base_url, api_key)),
    };

    Ok(adapter)
}

// -- Shared helpers --

/// Extract the human-readable message from a vendor error body
///
/// Understands `{"error": {"message": ..}}` (`OpenAI`, Anthropic, Google),
/// `{"error": ".."}`, `{"message": ..}` and `{"detail": ..}`.
pub fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let candidates = [
        value.pointer("/error/message"),
        value.get("error"),
        value.get("message"),
        value.get("detail"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(ToOwned::to_owned)
}

/// Parse a `retry-after` header given in seconds
pub fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Decode a stream payload, logging and skipping anything that does not fit
pub(crate) fn decode_chunk<T: DeserializeOwned>(provider: &str, payload: &str) -> Option<T> {
    match serde_json::from_str(payload) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            tracing::debug!(provider = %provider, error = %e, "skipping unparseable stream payload");
            None
        }
    }
}

/// Serialize a wire body into the request
pub(crate) fn to_body<T: Serialize>(body: &T) -> Result<serde_json::Value, LlmError> {
    serde_json::to_value(body).map_err(|e| LlmError::Unknown(format!("failed to encode request: {e}")))
}

/// Join an endpoint path onto a base URL, keeping the base's path
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, LlmError> {
    let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| LlmError::NoApiService(format!("invalid endpoint {joined}: {e}")))
}

/// Insert a credential header, marked sensitive so it never appears in debug output
pub(crate) fn insert_secret(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<(), LlmError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| LlmError::NoApiService("API key contains characters not allowed in a header".to_owned()))?;
    value.set_sensitive(true);
    headers.insert(name, value);
    Ok(())
}

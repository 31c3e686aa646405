//! One vendor, one model: request, transport and parsing glued together

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use chorus_config::ProviderConfig;
use futures_util::{Stream, StreamExt, stream};

use crate::error::LlmError;
use crate::provider::{ProviderAdapter, build_adapter};
use crate::sse;
use crate::transport::{Transport, WireResponse};
use crate::types::{Completion, GenerationSettings, Message, StreamDelta};

/// Stream of canonical deltas for one call
///
/// Ends after exactly one `is_final` delta or after the first error.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<StreamDelta, LlmError>> + Send>>;

/// Completion client bound to one adapter and model
#[derive(Clone)]
pub struct CompletionClient {
    adapter: Arc<dyn ProviderAdapter>,
    transport: Arc<dyn Transport>,
    model: String,
}

impl CompletionClient {
    /// Create a client from parts
    pub fn new(adapter: Arc<dyn ProviderAdapter>, transport: Arc<dyn Transport>, model: impl Into<String>) -> Self {
        Self {
            adapter,
            transport,
            model: model.into(),
        }
    }

    /// Create a client for a configured target
    ///
    /// # Errors
    ///
    /// Returns `NoApiService` if the target is missing required settings
    pub fn from_config(label: &str, config: &ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self, LlmError> {
        Ok(Self::new(build_adapter(label, config)?, transport, config.model.clone()))
    }

    /// The vendor adapter
    pub fn adapter(&self) -> &dyn ProviderAdapter {
        self.adapter.as_ref()
    }

    /// The model identifier sent with every request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the model can stream
    pub fn supports_streaming(&self) -> bool {
        self.adapter.capabilities(&self.model).streaming
    }

    /// Single-shot completion
    ///
    /// # Errors
    ///
    /// Returns the canonical error for transport, status or body failures
    pub async fn complete(&self, history: &[Message], settings: &GenerationSettings) -> Result<Completion, LlmError> {
        let response = self.send(history, settings, false).await?;
        let body = response.text().await?;
        self.adapter.parse_full_response(&body)
    }

    /// Streaming completion
    ///
    /// Resolves once the response head has arrived and was successful.
    ///
    /// # Errors
    ///
    /// Returns the canonical error if the request is rejected up front
    pub async fn stream(&self, history: &[Message], settings: &GenerationSettings) -> Result<DeltaStream, LlmError> {
        let response = self.send(history, settings, true).await?;
        let payloads = sse::payloads(response.body, self.adapter.frame_mode());
        Ok(deltas(Box::pin(payloads), Arc::clone(&self.adapter)))
    }

    async fn send(
        &self,
        history: &[Message],
        settings: &GenerationSettings,
        stream: bool,
    ) -> Result<WireResponse, LlmError> {
        let provider = self.adapter.name();
        let request = self.adapter.build_request(history, settings, &self.model, stream)?;

        tracing::debug!(
            provider = %provider,
            model = %self.model,
            url = %request.url,
            stream,
            reasoning_effort = %settings.reasoning_effort,
            "sending completion request"
        );

        let response = self.transport.send(request).await.inspect_err(|e| {
            tracing::warn!(provider = %provider, model = %self.model, error = %e, "completion request failed");
        })?;

        if response.status.is_success() {
            return Ok(response);
        }

        let status = response.status;
        let headers = response.headers.clone();
        let body = response.text().await?;
        let error = self.adapter.parse_error(status, &headers, &body);

        tracing::warn!(
            provider = %provider,
            model = %self.model,
            status = %status,
            kind = error.kind(),
            "vendor returned error"
        );

        Err(error)
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.adapter.name())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

type PayloadStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Turn frame payloads into canonical deltas
///
/// Guarantees exactly one final delta per successful stream: anything after
/// the vendor's terminal signal is dropped, and one is synthesized if the
/// body ends without it.
fn deltas(payloads: PayloadStream, adapter: Arc<dyn ProviderAdapter>) -> DeltaStream {
    struct State {
        payloads: PayloadStream,
        adapter: Arc<dyn ProviderAdapter>,
        ready: VecDeque<StreamDelta>,
        done: bool,
    }

    let state = State {
        payloads,
        adapter,
        ready: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }
            if let Some(delta) = state.ready.pop_front() {
                if delta.is_final {
                    state.done = true;
                }
                return Some((Ok(delta), state));
            }

            match state.payloads.next().await {
                Some(Ok(payload)) => match state.adapter.parse_stream_chunk(&payload) {
                    Ok(deltas) => state.ready.extend(deltas),
                    Err(e) => {
                        tracing::warn!(provider = %state.adapter.name(), error = %e, "vendor reported error mid-stream");
                        state.done = true;
                        return Some((Err(e), state));
                    }
                },
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => state.ready.push_back(StreamDelta::finished()),
            }
        }
    }))
}

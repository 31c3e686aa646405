//! `OpenAI` and OpenAI-compatible vendors
//!
//! `OpenAI`, `DeepSeek`, `OpenRouter` and generic compatible servers share
//! one wire format and differ only in defaults and in how the reasoning
//! setting is encoded, which `OpenAiDialect` captures.

use chorus_config::ProviderKind;
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use http::HeaderMap;
use url::Url;

use super::{ProviderAdapter, ProviderCapabilities, WireRequest, decode_chunk, endpoint, insert_secret, to_body};
use crate::convert::openai::{openai_chunk_to_deltas, to_openai_messages};
use crate::error::{LlmError, decode_json};
use crate::protocol::openai::{OpenAiErrorResponse, OpenAiReasoning, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk};
use crate::sse::FrameMode;
use crate::types::{Completion, GenerationSettings, Message, ReasoningEffort, StreamDelta};

/// Literal payload some servers send after the last chunk
const DONE_SENTINEL: &str = "[DONE]";

/// Variant of the `OpenAI` wire format spoken by a vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiDialect {
    /// api.openai.com
    OpenAi,
    /// api.deepseek.com; reasoning is chosen by model, not by parameter
    Deepseek,
    /// openrouter.ai; nested `reasoning` object
    Openrouter,
    /// Any other compatible server
    Compatible,
}

impl OpenAiDialect {
    const fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::Deepseek => Some("https://api.deepseek.com/v1"),
            Self::Openrouter => Some("https://openrouter.ai/api/v1"),
            Self::Compatible => None,
        }
    }

    const fn kind(self) -> ProviderKind {
        match self {
            Self::OpenAi => ProviderKind::Openai,
            Self::Deepseek => ProviderKind::Deepseek,
            Self::Openrouter => ProviderKind::Openrouter,
            Self::Compatible => ProviderKind::OpenaiCompatible,
        }
    }

    const fn inline_images(self) -> bool {
        !matches!(self, Self::Deepseek)
    }

    /// Level token for an effort; only `OpenAI` accepts `xhigh`
    const fn effort_token(self, effort: ReasoningEffort) -> Option<&'static str> {
        match effort {
            ReasoningEffort::Off => None,
            ReasoningEffort::Low => Some("low"),
            ReasoningEffort::Medium => Some("medium"),
            ReasoningEffort::High => Some("high"),
            ReasoningEffort::ExtraHigh => match self {
                Self::OpenAi => Some("xhigh"),
                Self::Deepseek | Self::Openrouter | Self::Compatible => Some("high"),
            },
        }
    }
}

/// Whether an `OpenAI` model is a reasoning model
///
/// Reasoning models take `max_completion_tokens` and reject `temperature`.
fn is_reasoning_model(model: &str) -> bool {
    let model = model.rsplit('/').next().unwrap_or(model);
    ["o1", "o3", "o4", "gpt-5"].iter().any(|prefix| {
        model
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['-', '.']))
    })
}

/// Adapter for the `OpenAI` family
pub struct OpenAiAdapter {
    name: String,
    dialect: OpenAiDialect,
    completions_url: Url,
    api_key: Option<String>,
}

impl OpenAiAdapter {
    /// Create an adapter; `base_url` falls back to the dialect's default
    ///
    /// # Errors
    ///
    /// Returns `NoApiService` if no base URL is available or it is invalid
    ///
    /// # Panics
    ///
    /// Panics if a hardcoded default base URL is invalid (should never happen)
    pub fn new(
        name: impl Into<String>,
        dialect: OpenAiDialect,
        base_url: Option<Url>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        let name = name.into();
        let base_url = match (base_url, dialect.default_base_url()) {
            (Some(url), _) => url,
            (None, Some(default)) => Url::parse(default).expect("valid default URL"),
            (None, None) => return Err(LlmError::NoApiService(format!("target '{name}' has no base_url"))),
        };

        Ok(Self {
            completions_url: endpoint(&base_url, "chat/completions")?,
            name,
            dialect,
            api_key,
        })
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            insert_secret(&mut headers, AUTHORIZATION, &format!("Bearer {key}"))?;
        }
        if self.dialect == OpenAiDialect::Openrouter {
            headers.insert(HeaderName::from_static("x-title"), HeaderValue::from_static("chorus"));
        }
        Ok(headers)
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.dialect.kind()
    }

    fn capabilities(&self, _model: &str) -> ProviderCapabilities {
        ProviderCapabilities { streaming: true }
    }

    fn frame_mode(&self) -> FrameMode {
        FrameMode::Compatibility
    }

    fn build_request(
        &self,
        history: &[Message],
        settings: &GenerationSettings,
        model: &str,
        stream: bool,
    ) -> Result<WireRequest, LlmError> {
        let mut request = OpenAiRequest {
            model: model.to_owned(),
            messages: to_openai_messages(history, self.dialect.inline_images()),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            stream,
            ..OpenAiRequest::default()
        };

        if self.dialect == OpenAiDialect::OpenAi && is_reasoning_model(model) {
            request.max_completion_tokens = request.max_tokens.take();
            request.temperature = None;
        }

        let effort = self.dialect.effort_token(settings.reasoning_effort).map(str::to_owned);
        match self.dialect {
            OpenAiDialect::OpenAi | OpenAiDialect::Compatible => request.reasoning_effort = effort,
            OpenAiDialect::Openrouter => request.reasoning = effort.map(|effort| OpenAiReasoning { effort }),
            OpenAiDialect::Deepseek => {}
        }

        Ok(WireRequest {
            url: self.completions_url.clone(),
            headers: self.headers()?,
            body: to_body(&request)?,
        })
    }

    fn parse_stream_chunk(&self, payload: &str) -> Result<Vec<StreamDelta>, LlmError> {
        let payload = payload.trim();
        if payload == DONE_SENTINEL {
            return Ok(vec![StreamDelta::finished()]);
        }

        if let Ok(envelope) = serde_json::from_str::<OpenAiErrorResponse>(payload) {
            return Err(envelope_error(envelope));
        }

        Ok(decode_chunk::<OpenAiStreamChunk>(&self.name, payload)
            .map(openai_chunk_to_deltas)
            .unwrap_or_default())
    }

    fn parse_full_response(&self, body: &str) -> Result<Completion, LlmError> {
        if let Ok(envelope) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            return Err(envelope_error(envelope));
        }
        decode_json::<OpenAiResponse>(body).map(Completion::from)
    }
}

fn envelope_error(envelope: OpenAiErrorResponse) -> LlmError {
    let detail = envelope.error;
    let code = detail.code.as_ref().and_then(|c| c.as_str());
    let status = detail
        .code
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .and_then(|c| u16::try_from(c).ok());
    LlmError::from_envelope(detail.error_type.as_deref().or(code), status, detail.message)
}

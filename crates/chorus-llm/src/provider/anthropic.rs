//! Anthropic Messages API adapter

use chorus_config::ProviderKind;
use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use url::Url;

use super::{ProviderAdapter, ProviderCapabilities, WireRequest, decode_chunk, endpoint, insert_secret, to_body};
use crate::convert::anthropic::{anthropic_event_to_deltas, to_anthropic_messages};
use crate::error::{LlmError, decode_json};
use crate::protocol::anthropic::{
    AnthropicErrorResponse, AnthropicRequest, AnthropicResponse, AnthropicStreamEvent, AnthropicThinking,
};
use crate::types::{Completion, GenerationSettings, Message, ReasoningEffort, StreamDelta};

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` when none is configured; the API requires one
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Thinking token budget for an effort level
const fn thinking_budget(effort: ReasoningEffort) -> Option<u32> {
    match effort {
        ReasoningEffort::Off => None,
        ReasoningEffort::Low => Some(2048),
        ReasoningEffort::Medium => Some(8192),
        ReasoningEffort::High => Some(16_384),
        ReasoningEffort::ExtraHigh => Some(32_768),
    }
}

/// Adapter for Anthropic
pub struct AnthropicAdapter {
    name: String,
    messages_url: Url,
    api_key: Option<String>,
}

impl AnthropicAdapter {
    /// Create an adapter
    ///
    /// # Errors
    ///
    /// Returns `NoApiService` if the base URL is invalid
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never happen)
    pub fn new(name: impl Into<String>, base_url: Option<Url>, api_key: Option<String>) -> Result<Self, LlmError> {
        let base_url = base_url.unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL"));

        Ok(Self {
            name: name.into(),
            messages_url: endpoint(&base_url, "messages")?,
            api_key,
        })
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn capabilities(&self, _model: &str) -> ProviderCapabilities {
        ProviderCapabilities { streaming: true }
    }

    fn build_request(
        &self,
        history: &[Message],
        settings: &GenerationSettings,
        model: &str,
        stream: bool,
    ) -> Result<WireRequest, LlmError> {
        let (system, messages) = to_anthropic_messages(history);
        let mut max_tokens = settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let mut temperature = settings.temperature;

        let thinking = thinking_budget(settings.reasoning_effort).map(|budget_tokens| {
            if max_tokens <= budget_tokens {
                max_tokens = budget_tokens + DEFAULT_MAX_TOKENS;
            }
            temperature = None;
            AnthropicThinking {
                thinking_type: "enabled",
                budget_tokens,
            }
        });

        let request = AnthropicRequest {
            model: model.to_owned(),
            messages,
            system,
            max_tokens,
            temperature,
            thinking,
            stream,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        if let Some(key) = &self.api_key {
            insert_secret(&mut headers, HeaderName::from_static("x-api-key"), key)?;
        }

        Ok(WireRequest {
            url: self.messages_url.clone(),
            headers,
            body: to_body(&request)?,
        })
    }

    fn parse_stream_chunk(&self, payload: &str) -> Result<Vec<StreamDelta>, LlmError> {
        decode_chunk::<AnthropicStreamEvent>(&self.name, payload).map_or_else(|| Ok(Vec::new()), anthropic_event_to_deltas)
    }

    fn parse_full_response(&self, body: &str) -> Result<Completion, LlmError> {
        if let Ok(envelope) = serde_json::from_str::<AnthropicErrorResponse>(body) {
            let error = envelope.error;
            return Err(LlmError::from_envelope(Some(&error.error_type), None, error.message));
        }
        decode_json::<AnthropicResponse>(body).map(Completion::from)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::DeltaRole;

    fn adapter() -> AnthropicAdapter {
        AnthropicAdapter::new("claude", None, Some("sk-ant".into())).unwrap()
    }

    #[test]
    fn thinking_is_nested_with_budget() {
        let settings = GenerationSettings {
            temperature: Some(0.7),
            max_tokens: Some(1024),
            reasoning_effort: ReasoningEffort::Medium,
        };
        let request = adapter()
            .build_request(
                &[Message::system("sys"), Message::user("hi")],
                &settings,
                "claude-sonnet-4-5",
                true,
            )
            .unwrap();

        assert_eq!(request.url.as_str(), "https://api.anthropic.com/v1/messages");
        assert_eq!(request.body["thinking"], json!({"type": "enabled", "budget_tokens": 8192}));
        assert_eq!(request.body["max_tokens"], json!(8192 + 4096));
        assert!(request.body.get("temperature").is_none());
        assert_eq!(request.body["system"], json!("sys"));
        assert_eq!(request.headers["anthropic-version"], ANTHROPIC_VERSION);
        assert_eq!(request.headers["x-api-key"], "sk-ant");
    }

    #[test]
    fn no_thinking_when_off() {
        let settings = GenerationSettings {
            temperature: Some(0.2),
            ..GenerationSettings::default()
        };
        let request = adapter()
            .build_request(&[Message::user("hi")], &settings, "claude-3-5-haiku-latest", false)
            .unwrap();

        assert_eq!(
            request.body,
            json!({
                "model": "claude-3-5-haiku-latest",
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}],
                "max_tokens": 4096,
                "temperature": 0.2,
                "stream": false
            })
        );
    }

    #[test]
    fn budgets_per_effort() {
        assert_eq!(thinking_budget(ReasoningEffort::Low), Some(2048));
        assert_eq!(thinking_budget(ReasoningEffort::High), Some(16_384));
        assert_eq!(thinking_budget(ReasoningEffort::ExtraHigh), Some(32_768));
    }

    #[test]
    fn large_max_tokens_is_kept() {
        let settings = GenerationSettings {
            max_tokens: Some(64_000),
            reasoning_effort: ReasoningEffort::Low,
            ..GenerationSettings::default()
        };
        let request = adapter()
            .build_request(&[Message::user("hi")], &settings, "claude-opus-4-1", true)
            .unwrap();
        assert_eq!(request.body["max_tokens"], json!(64_000));
    }

    #[test]
    fn stream_thinking_delta() {
        let deltas = adapter()
            .parse_stream_chunk(r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"step"}}"#)
            .unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].role, DeltaRole::Reasoning);
        assert!(!deltas[0].is_final);
    }

    #[test]
    fn error_body() {
        let err = adapter()
            .parse_full_response(r#"{"type":"error","error":{"type":"invalid_request_error","message":"thinking: Extra inputs are not permitted"}}"#)
            .unwrap_err();
        assert_eq!(
            err,
            LlmError::ServerError {
                status: None,
                message: "thinking: Extra inputs are not permitted".into()
            }
        );
    }
}

//! Google Generative Language API adapter

use chorus_config::ProviderKind;
use http::HeaderMap;
use http::header::HeaderName;
use url::Url;

use super::{ProviderAdapter, ProviderCapabilities, WireRequest, decode_chunk, endpoint, insert_secret, to_body};
use crate::convert::google::{google_chunk_to_deltas, google_response_to_completion, to_google_contents};
use crate::error::{LlmError, decode_json};
use crate::protocol::google::{
    GoogleErrorResponse, GoogleGenerationConfig, GoogleRequest, GoogleResponse, GoogleThinkingConfig,
};
use crate::types::{Completion, GenerationSettings, Message, ReasoningEffort, StreamDelta};

/// Default Google Generative Language API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Thinking token budget for an effort level
const fn thinking_budget(effort: ReasoningEffort) -> Option<u32> {
    match effort {
        ReasoningEffort::Off => None,
        ReasoningEffort::Low => Some(1024),
        ReasoningEffort::Medium => Some(8192),
        ReasoningEffort::High => Some(16_384),
        ReasoningEffort::ExtraHigh => Some(24_576),
    }
}

/// Adapter for Google Gemini models
pub struct GoogleAdapter {
    name: String,
    base_url: Url,
    api_key: Option<String>,
}

impl GoogleAdapter {
    /// Create an adapter
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never happen)
    pub fn new(name: impl Into<String>, base_url: Option<Url>, api_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("valid default URL")),
            api_key,
        }
    }

    /// `generateContent` or SSE `streamGenerateContent` URL for a model
    fn generate_url(&self, model: &str, stream: bool) -> Result<Url, LlmError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let method = if stream { "streamGenerateContent" } else { "generateContent" };
        let mut url = endpoint(&self.base_url, &format!("models/{model}:{method}"))?;
        if stream {
            url.query_pairs_mut().append_pair("alt", "sse");
        }
        Ok(url)
    }
}

impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
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
        let (system_instruction, contents) = to_google_contents(history);

        let generation_config = GoogleGenerationConfig {
            temperature: settings.temperature,
            max_output_tokens: settings.max_tokens,
            thinking_config: thinking_budget(settings.reasoning_effort).map(|thinking_budget| GoogleThinkingConfig {
                thinking_budget,
                include_thoughts: true,
            }),
        };

        let request = GoogleRequest {
            contents,
            system_instruction,
            generation_config: (!generation_config.is_empty()).then_some(generation_config),
        };

        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            insert_secret(&mut headers, HeaderName::from_static("x-goog-api-key"), key)?;
        }

        Ok(WireRequest {
            url: self.generate_url(model, stream)?,
            headers,
            body: to_body(&request)?,
        })
    }

    fn parse_stream_chunk(&self, payload: &str) -> Result<Vec<StreamDelta>, LlmError> {
        if let Ok(envelope) = serde_json::from_str::<GoogleErrorResponse>(payload) {
            return Err(envelope_error(envelope));
        }
        decode_chunk::<GoogleResponse>(&self.name, payload).map_or_else(|| Ok(Vec::new()), google_chunk_to_deltas)
    }

    fn parse_full_response(&self, body: &str) -> Result<Completion, LlmError> {
        if let Ok(envelope) = serde_json::from_str::<GoogleErrorResponse>(body) {
            return Err(envelope_error(envelope));
        }
        decode_json::<GoogleResponse>(body).and_then(google_response_to_completion)
    }
}

fn envelope_error(envelope: GoogleErrorResponse) -> LlmError {
    let error = envelope.error;
    LlmError::from_envelope(error.status.as_deref(), error.code, error.message)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn adapter() -> GoogleAdapter {
        GoogleAdapter::new("gemini", None, Some("g-key".into()))
    }

    #[test]
    fn stream_url_uses_sse() {
        let request = adapter()
            .build_request(&[Message::user("hi")], &GenerationSettings::default(), "gemini-2.5-pro", true)
            .unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:streamGenerateContent?alt=sse"
        );
        assert_eq!(request.headers["x-goog-api-key"], "g-key");
        assert!(request.body.get("generationConfig").is_none());
    }

    #[test]
    fn single_shot_url_and_prefixed_model() {
        let request = adapter()
            .build_request(&[Message::user("hi")], &GenerationSettings::default(), "models/gemini-2.5-flash", false)
            .unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn thinking_config() {
        let settings = GenerationSettings {
            temperature: Some(1.0),
            max_tokens: None,
            reasoning_effort: ReasoningEffort::ExtraHigh,
        };
        let request = adapter()
            .build_request(&[Message::system("s"), Message::user("hi")], &settings, "gemini-2.5-pro", true)
            .unwrap();

        assert_eq!(
            request.body,
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "systemInstruction": {"parts": [{"text": "s"}]},
                "generationConfig": {
                    "temperature": 1.0,
                    "thinkingConfig": {"thinkingBudget": 24576, "includeThoughts": true}
                }
            })
        );
    }

    #[test]
    fn in_stream_error_envelope() {
        let err = adapter()
            .parse_stream_chunk(r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#)
            .unwrap_err();
        assert_eq!(
            err,
            LlmError::ServerError {
                status: Some(503),
                message: "The model is overloaded.".into()
            }
        );
    }
}

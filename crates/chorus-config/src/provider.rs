use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for a single provider target
///
/// One vendor, one model, one credential. The table label in the config file
/// is the target's display name.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Vendor protocol
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Vendor model identifier
    pub model: String,
}

impl ProviderConfig {
    /// Create a config for `kind` and `model` with no key or base URL
    pub fn new(kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: None,
            base_url: None,
            model: model.into(),
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }
}

/// Supported vendor protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProviderKind {
    /// `OpenAI` chat completions
    Openai,
    /// Anthropic Messages API
    Anthropic,
    /// Google Generative Language API
    Google,
    /// `DeepSeek` (OpenAI-compatible with reasoning content)
    Deepseek,
    /// `OpenRouter` (OpenAI-compatible with nested reasoning options)
    Openrouter,
    /// Any other OpenAI-compatible endpoint (Mistral, Perplexity, LM Studio, ...)
    OpenaiCompatible,
}

impl ProviderKind {
    /// Whether a base URL must be configured explicitly
    pub const fn requires_base_url(self) -> bool {
        matches!(self, Self::OpenaiCompatible)
    }

    /// Whether an API key must be configured
    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::OpenaiCompatible)
    }
}

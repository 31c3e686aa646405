use serde::Deserialize;

/// Default generation settings applied to every turn
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Requested reasoning depth
    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,
    /// System prompt prepended to every conversation
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Stream responses when the model supports it
    #[serde(default = "default_stream")]
    pub stream: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: None,
            reasoning_effort: ReasoningEffort::default(),
            system_prompt: None,
            stream: default_stream(),
        }
    }
}

const fn default_stream() -> bool {
    true
}

/// Requested reasoning depth, independent of how a vendor encodes it
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReasoningEffort {
    /// Do not request reasoning
    #[default]
    Off,
    /// Light reasoning
    Low,
    /// Moderate reasoning
    Medium,
    /// Deep reasoning
    High,
    /// Deepest reasoning the vendor offers
    ExtraHigh,
}

impl ReasoningEffort {
    /// Whether any reasoning was requested
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Off)
    }
}

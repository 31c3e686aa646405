pub use chorus_config::ReasoningEffort;
use chorus_config::GenerationConfig;

/// Per-request generation settings
///
/// Immutable from the adapters' point of view; each adapter decides how (or
/// whether) a field is encoded for its vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationSettings {
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Requested reasoning depth
    pub reasoning_effort: ReasoningEffort,
}

impl GenerationSettings {
    /// Copy of these settings with reasoning turned off
    #[must_use]
    pub const fn without_reasoning(self) -> Self {
        Self {
            reasoning_effort: ReasoningEffort::Off,
            ..self
        }
    }

    /// Override the reasoning effort
    #[must_use]
    pub const fn with_reasoning_effort(self, reasoning_effort: ReasoningEffort) -> Self {
        Self {
            reasoning_effort,
            ..self
        }
    }
}

impl From<&GenerationConfig> for GenerationSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            reasoning_effort: config.reasoning_effort,
        }
    }
}

/// Which channel a delta's text belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeltaRole {
    /// Answer text
    #[default]
    Text,
    /// Chain-of-thought text
    Reasoning,
}

/// Incremental update within a streaming response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDelta {
    /// Text fragment, possibly empty
    pub text: String,
    /// Channel of `text`
    pub role: DeltaRole,
    /// Set on the one terminal delta of a call
    pub is_final: bool,
    /// Partial tool call data
    pub tool_call: Option<ToolCallFragment>,
}

impl StreamDelta {
    /// Answer text fragment
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Reasoning text fragment
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: DeltaRole::Reasoning,
            ..Self::default()
        }
    }

    /// Empty terminal delta
    pub fn finished() -> Self {
        Self {
            is_final: true,
            ..Self::default()
        }
    }

    /// Whether this delta carries nothing but possibly the final flag
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.tool_call.is_none()
    }
}

/// Partial tool call data within a stream delta
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    /// Position of the call among the response's tool calls
    pub index: u32,
    /// Call identifier (first fragment only)
    pub id: Option<String>,
    /// Function name (first fragment only)
    pub name: Option<String>,
    /// Incremental JSON arguments
    pub arguments: Option<String>,
}

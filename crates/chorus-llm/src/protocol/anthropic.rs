//! Anthropic Messages API wire format types

use serde::{Deserialize, Serialize};

// -- Request types --

/// Messages API request
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages (user and assistant only)
    pub messages: Vec<AnthropicMessage>,
    /// System prompt, carried outside the message list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Maximum tokens to generate; required by the API
    pub max_tokens: u32,
    /// Sampling temperature; rejected while thinking is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Extended thinking configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<AnthropicThinking>,
    /// Whether to stream the response
    pub stream: bool,
}

/// Extended thinking request object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnthropicThinking {
    /// Always "enabled" when present
    #[serde(rename = "type")]
    pub thinking_type: &'static str,
    /// Token budget reserved for thinking
    pub budget_tokens: u32,
}

/// Message within a request
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    /// "user" or "assistant"
    pub role: &'static str,
    /// Content blocks
    pub content: Vec<AnthropicContentBlock>,
}

/// Request content block
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    /// Text block
    Text {
        /// The text string
        text: String,
    },
    /// Inline image block
    Image {
        /// Image data
        source: AnthropicImageSource,
    },
}

/// Base64 image source
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicImageSource {
    /// Always "base64"
    #[serde(rename = "type")]
    pub source_type: &'static str,
    /// MIME type
    pub media_type: String,
    /// Base64 payload
    pub data: String,
}

// -- Response types --

/// Messages API response
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicResponse {
    /// Content blocks
    pub content: Vec<AnthropicResponseBlock>,
    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Response content block
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicResponseBlock {
    /// Answer text
    Text {
        /// Text content
        text: String,
    },
    /// Visible thinking
    Thinking {
        /// Thinking text
        thinking: String,
    },
    /// Block types this client does not use (tool use, redacted thinking, ...)
    #[serde(other)]
    Other,
}

// -- Streaming types --

/// SSE event payloads, discriminated by their `type` field
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    /// Stream started
    MessageStart {},
    /// New content block started
    ContentBlockStart {
        /// Block index
        index: u32,
        /// Initial block content
        content_block: AnthropicStreamContentBlock,
    },
    /// Incremental content within a block
    ContentBlockDelta {
        /// Block index
        index: u32,
        /// Delta content
        delta: AnthropicStreamDelta,
    },
    /// Content block finished
    ContentBlockStop {},
    /// Message metadata delta (stop reason, usage)
    MessageDelta {
        /// Delta with stop reason
        delta: AnthropicMessageDelta,
    },
    /// Stream completed
    MessageStop,
    /// Keep-alive
    Ping,
    /// In-stream failure, e.g. `overloaded_error`
    Error {
        /// Error details
        error: AnthropicErrorDetail,
    },
}

/// Content block in a `content_block_start` event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamContentBlock {
    /// Text block
    Text {
        /// Initial text (usually empty)
        #[serde(default)]
        text: String,
    },
    /// Thinking block
    Thinking {
        /// Initial thinking (usually empty)
        #[serde(default)]
        thinking: String,
    },
    /// Tool use block
    ToolUse {
        /// Tool use ID
        id: String,
        /// Tool name
        name: String,
    },
    /// Anything else
    #[serde(other)]
    Other,
}

/// Delta content in a `content_block_delta` event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamDelta {
    /// Incremental text
    TextDelta {
        /// Text fragment
        text: String,
    },
    /// Incremental thinking
    ThinkingDelta {
        /// Thinking fragment
        thinking: String,
    },
    /// Incremental tool input JSON
    InputJsonDelta {
        /// JSON fragment
        partial_json: String,
    },
    /// Signature and other opaque deltas
    #[serde(other)]
    Other,
}

/// Delta in a `message_delta` event
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicMessageDelta {
    /// Stop reason
    #[serde(default)]
    pub stop_reason: Option<String>,
}

// -- Error response --

/// Error body
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorResponse {
    /// Error details
    pub error: AnthropicErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorDetail {
    /// Error type, e.g. `invalid_request_error`
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message
    pub message: String,
}

//! Conversion between canonical types and Anthropic wire format

use super::{push_grouped, system_instruction};
use crate::error::LlmError;
use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicImageSource, AnthropicMessage, AnthropicResponse, AnthropicResponseBlock,
    AnthropicStreamContentBlock, AnthropicStreamDelta, AnthropicStreamEvent,
};
use crate::types::{Completion, Content, Message, Role, StreamDelta, ToolCallFragment};

// -- Outbound: canonical history -> Anthropic messages --

/// Split a history into the system prompt and alternating turns
///
/// System messages are lifted into the top-level `system` field, reasoning
/// is dropped, and consecutive same-role messages are merged into one
/// turn with several content blocks.
pub fn to_anthropic_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut groups: Vec<(&'static str, Vec<AnthropicContentBlock>)> = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System | Role::Reasoning => continue,
        };
        push_grouped(&mut groups, role, content_block(&message.content));
    }

    let turns = groups
        .into_iter()
        .map(|(role, content)| AnthropicMessage { role, content })
        .collect();

    (system_instruction(messages), turns)
}

fn content_block(content: &Content) -> AnthropicContentBlock {
    match content {
        Content::Attachment(attachment) if attachment.is_image() => AnthropicContentBlock::Image {
            source: AnthropicImageSource {
                source_type: "base64",
                media_type: attachment.media_type.clone(),
                data: attachment.base64_data().to_owned(),
            },
        },
        content => AnthropicContentBlock::Text {
            text: content.as_text(),
        },
    }
}

// -- Inbound: Anthropic responses -> canonical types --

impl From<AnthropicResponse> for Completion {
    fn from(response: AnthropicResponse) -> Self {
        let mut text = String::new();
        let mut reasoning = String::new();

        for block in response.content {
            match block {
                AnthropicResponseBlock::Text { text: t } => text.push_str(&t),
                AnthropicResponseBlock::Thinking { thinking } => reasoning.push_str(&thinking),
                AnthropicResponseBlock::Other => {}
            }
        }

        Self {
            text,
            reasoning: (!reasoning.is_empty()).then_some(reasoning),
        }
    }
}

/// Convert one stream event into deltas
///
/// `message_stop` is the terminal signal; an `error` event ends the call.
///
/// # Errors
///
/// Returns the classified vendor error for an `error` event
pub fn anthropic_event_to_deltas(event: AnthropicStreamEvent) -> Result<Vec<StreamDelta>, LlmError> {
    let delta = match event {
        AnthropicStreamEvent::ContentBlockStart { index, content_block } => match content_block {
            AnthropicStreamContentBlock::Text { text } if !text.is_empty() => StreamDelta::text(text),
            AnthropicStreamContentBlock::Thinking { thinking } if !thinking.is_empty() => {
                StreamDelta::reasoning(thinking)
            }
            AnthropicStreamContentBlock::ToolUse { id, name } => StreamDelta {
                tool_call: Some(ToolCallFragment {
                    index,
                    id: Some(id),
                    name: Some(name),
                    arguments: None,
                }),
                ..StreamDelta::default()
            },
            _ => return Ok(Vec::new()),
        },
        AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
            AnthropicStreamDelta::TextDelta { text } => StreamDelta::text(text),
            AnthropicStreamDelta::ThinkingDelta { thinking } => StreamDelta::reasoning(thinking),
            AnthropicStreamDelta::InputJsonDelta { partial_json } => StreamDelta {
                tool_call: Some(ToolCallFragment {
                    index,
                    arguments: Some(partial_json),
                    ..ToolCallFragment::default()
                }),
                ..StreamDelta::default()
            },
            AnthropicStreamDelta::Other => return Ok(Vec::new()),
        },
        AnthropicStreamEvent::MessageStop => StreamDelta::finished(),
        AnthropicStreamEvent::Error { error } => {
            return Err(LlmError::from_envelope(Some(&error.error_type), None, error.message));
        }
        AnthropicStreamEvent::MessageStart {}
        | AnthropicStreamEvent::ContentBlockStop {}
        | AnthropicStreamEvent::MessageDelta { .. }
        | AnthropicStreamEvent::Ping => return Ok(Vec::new()),
    };

    Ok(vec![delta])
}

//! Conversion between canonical types and `OpenAI` wire format

use crate::protocol::openai::{
    OpenAiContent, OpenAiContentPart, OpenAiImageUrl, OpenAiMessage, OpenAiResponse, OpenAiStreamChunk,
};
use crate::types::{Completion, Content, Message, Role, StreamDelta, ToolCallFragment};

// -- Outbound: canonical history -> OpenAI messages --

/// Convert the outbound part of a history into request messages
///
/// Image attachments become `image_url` parts when `inline_images` is set;
/// any other attachment is sent as its text placeholder.
pub fn to_openai_messages(messages: &[Message], inline_images: bool) -> Vec<OpenAiMessage> {
    messages
        .iter()
        .filter(|m| m.is_outbound())
        .map(|m| OpenAiMessage {
            role: match m.role {
                Role::System => "system",
                Role::Assistant => "assistant",
                Role::User | Role::Reasoning => "user",
            },
            content: match &m.content {
                Content::Attachment(attachment) if inline_images && attachment.is_image() => {
                    OpenAiContent::Parts(vec![OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl {
                            url: attachment.data_url.clone(),
                        },
                    }])
                }
                content => OpenAiContent::Text(content.as_text()),
            },
        })
        .collect()
}

// -- Inbound: OpenAI responses -> canonical types --

impl From<OpenAiResponse> for Completion {
    fn from(response: OpenAiResponse) -> Self {
        let Some(message) = response.choices.into_iter().next().map(|c| c.message) else {
            return Self::default();
        };

        Self {
            text: message.content.unwrap_or_default(),
            reasoning: message.reasoning_content.or(message.reasoning).filter(|r| !r.is_empty()),
        }
    }
}

/// Convert a streaming chunk into deltas
///
/// Reasoning is emitted before answer text from the same chunk, and a
/// `finish_reason` closes with a final delta.
pub fn openai_chunk_to_deltas(chunk: OpenAiStreamChunk) -> Vec<StreamDelta> {
    let mut deltas = Vec::new();

    let Some(choice) = chunk.choices.into_iter().next() else {
        return deltas;
    };
    let delta = choice.delta;

    if let Some(reasoning) = delta.reasoning_content.or(delta.reasoning).filter(|r| !r.is_empty()) {
        deltas.push(StreamDelta::reasoning(reasoning));
    }
    if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
        deltas.push(StreamDelta::text(content));
    }
    for call in delta.tool_calls.into_iter().flatten() {
        let (name, arguments) = call.function.map_or((None, None), |f| (f.name, f.arguments));
        deltas.push(StreamDelta {
            tool_call: Some(ToolCallFragment {
                index: call.index,
                id: call.id,
                name,
                arguments,
            }),
            ..StreamDelta::default()
        });
    }
    if choice.finish_reason.is_some() {
        deltas.push(StreamDelta::finished());
    }

    deltas
}

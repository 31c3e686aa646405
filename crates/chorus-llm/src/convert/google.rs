//! Conversion between canonical types and Google wire format

use super::{push_grouped, system_instruction};
use crate::error::LlmError;
use crate::protocol::google::{GoogleContent, GoogleInlineData, GooglePart, GoogleResponse};
use crate::types::{Completion, Content, Message, Role, StreamDelta};

// -- Outbound: canonical history -> Google contents --

/// Split a history into the system instruction and alternating contents
pub fn to_google_contents(messages: &[Message]) -> (Option<GoogleContent>, Vec<GoogleContent>) {
    let mut groups: Vec<(&'static str, Vec<GooglePart>)> = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "model",
            Role::System | Role::Reasoning => continue,
        };
        push_grouped(&mut groups, role, part(&message.content));
    }

    let contents = groups
        .into_iter()
        .map(|(role, parts)| GoogleContent {
            role: Some(role.to_owned()),
            parts,
        })
        .collect();

    let system = system_instruction(messages).map(|text| GoogleContent {
        role: None,
        parts: vec![GooglePart::text(text)],
    });

    (system, contents)
}

fn part(content: &Content) -> GooglePart {
    match content {
        Content::Attachment(attachment) if attachment.is_image() => GooglePart {
            inline_data: Some(GoogleInlineData {
                mime_type: attachment.media_type.clone(),
                data: attachment.base64_data().to_owned(),
            }),
            ..GooglePart::default()
        },
        content => GooglePart::text(content.as_text()),
    }
}

// -- Inbound: Google responses -> canonical types --

/// Convert a full `generateContent` body
///
/// # Errors
///
/// Returns `ServerError` when the prompt was blocked and no candidate exists
pub fn google_response_to_completion(response: GoogleResponse) -> Result<Completion, LlmError> {
    if response.candidates.is_empty()
        && let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason)
    {
        return Err(blocked(&reason));
    }

    let mut text = String::new();
    let mut reasoning = String::new();

    for part in response.candidates.into_iter().take(1).flat_map(|c| c.content.parts) {
        let Some(fragment) = part.text.as_deref() else {
            continue;
        };
        if part.is_thought() {
            reasoning.push_str(fragment);
        } else {
            text.push_str(fragment);
        }
    }

    Ok(Completion {
        text,
        reasoning: (!reasoning.is_empty()).then_some(reasoning),
    })
}

/// Convert one streamed response object into deltas
///
/// A candidate `finishReason` is the terminal signal.
///
/// # Errors
///
/// Returns `ServerError` when the prompt was blocked
pub fn google_chunk_to_deltas(chunk: GoogleResponse) -> Result<Vec<StreamDelta>, LlmError> {
    if chunk.candidates.is_empty()
        && let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason)
    {
        return Err(blocked(&reason));
    }

    let mut deltas = Vec::new();
    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(deltas);
    };

    for part in candidate.content.parts {
        let thought = part.is_thought();
        match part.text {
            Some(text) if !text.is_empty() && thought => deltas.push(StreamDelta::reasoning(text)),
            Some(text) if !text.is_empty() => deltas.push(StreamDelta::text(text)),
            _ => {}
        }
    }
    if candidate.finish_reason.is_some() {
        deltas.push(StreamDelta::finished());
    }

    Ok(deltas)
}

fn blocked(reason: &str) -> LlmError {
    LlmError::ServerError {
        status: None,
        message: format!("prompt blocked: {reason}"),
    }
}

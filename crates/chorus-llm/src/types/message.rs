use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant answer
    Assistant,
    /// Assistant chain-of-thought, kept apart from the answer
    ///
    /// Stored locally only; adapters never send it back to a vendor.
    Reasoning,
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: Content,
}

impl Message {
    /// Text message with the given role
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Content::Text(text.into()),
        }
    }

    /// System instruction
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    /// User message
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Assistant answer
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Whether this message may be sent to a vendor
    pub const fn is_outbound(&self) -> bool {
        !matches!(self.role, Role::Reasoning)
    }
}

/// Message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Content {
    /// Plain text
    Text(String),
    /// Reference to an attached file
    Attachment(AttachmentRef),
}

impl Content {
    /// Text form of the content
    ///
    /// Attachments render as a short placeholder naming the file.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Attachment(attachment) => attachment.placeholder(),
        }
    }
}

/// Attached file, already encoded by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Display name
    pub name: String,
    /// MIME type, e.g. `image/png`
    pub media_type: String,
    /// `data:` URL carrying the base64 payload
    pub data_url: String,
}

impl AttachmentRef {
    /// Whether vendors that accept inline images can take this attachment
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// Base64 payload without the `data:...;base64,` prefix
    pub fn base64_data(&self) -> &str {
        self.data_url
            .split_once(";base64,")
            .map_or(self.data_url.as_str(), |(_, data)| data)
    }

    /// Text stand-in for vendors or types that cannot carry the file
    pub fn placeholder(&self) -> String {
        format!("[attachment: {} ({})]", self.name, self.media_type)
    }
}

/// Builds the canonical history for one turn
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    system_prompt: Option<String>,
    history: Vec<Message>,
}

impl Conversation {
    /// Start an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a system prompt; blank prompts are ignored
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: Option<impl Into<String>>) -> Self {
        self.system_prompt = prompt.map(Into::into).filter(|p| !p.trim().is_empty());
        self
    }

    /// Append earlier messages
    #[must_use]
    pub fn with_history(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.history.extend(messages);
        self
    }

    /// Finish with the new user prompt and any attachments
    pub fn prompt(self, text: impl Into<String>, attachments: Vec<AttachmentRef>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + attachments.len() + 2);

        if let Some(prompt) = self.system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.extend(self.history);
        messages.extend(attachments.into_iter().map(|attachment| Message {
            role: Role::User,
            content: Content::Attachment(attachment),
        }));
        messages.push(Message::user(text));

        messages
    }
}

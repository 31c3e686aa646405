//! Multi-vendor completion client for Chorus
//!
//! Speaks the `OpenAI` chat-completions family (including `DeepSeek`,
//! `OpenRouter` and self-hosted compatible endpoints), Anthropic Messages and
//! Google Generative Language over HTTP. Streaming responses are decoded
//! incrementally into vendor-neutral deltas; turns can be cancelled at any
//! point and fanned out to several targets at once.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod client;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod negotiation;
pub mod protocol;
pub mod provider;
pub mod session;
pub mod sse;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{CompletionClient, DeltaStream};
pub use dispatch::{Dispatch, Dispatcher, MAX_TARGETS};
pub use error::LlmError;
pub use provider::{ProviderAdapter, ProviderCapabilities, WireRequest, build_adapter};
pub use session::{CancelHandle, ResponseMode, Session, Turn, TurnRequest, TurnState};
pub use sse::{FrameMode, FrameParser};
pub use transport::{HttpTransport, Transport, WireResponse};
pub use types::{
    AgentResult, AttachmentRef, Completion, Content, Conversation, GenerationSettings, Message, ReasoningEffort,
    Role, StreamDelta, TurnOutcome, TurnStatus,
};

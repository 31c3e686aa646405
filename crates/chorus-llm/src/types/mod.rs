//! Canonical, vendor-neutral types
//!
//! Every adapter translates between these and its own wire format; nothing
//! outside `provider`, `protocol` and `convert` sees a vendor shape.

pub mod message;
pub mod result;
pub mod settings;
pub mod stream;

pub use message::{AttachmentRef, Content, Conversation, Message, Role};
pub use result::{AgentResult, Completion, TurnOutcome, TurnStatus};
pub use settings::{GenerationSettings, ReasoningEffort};
pub use stream::{DeltaRole, StreamDelta, ToolCallFragment};

use jiff::Timestamp;

use crate::error::LlmError;

/// Parsed body of a single-shot completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Answer text
    pub text: String,
    /// Chain-of-thought text, when the vendor returned any
    pub reasoning: Option<String>,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    /// The vendor finished the answer
    Completed,
    /// The caller stopped the turn; not an error
    Cancelled,
    /// An error ended the turn
    Failed(LlmError),
}

/// Final state of one conversation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Answer text accumulated so far
    pub text: String,
    /// Reasoning text accumulated so far
    pub reasoning: String,
    /// Terminal status
    pub status: TurnStatus,
}

impl TurnOutcome {
    /// Whether the turn completed
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, TurnStatus::Completed)
    }

    /// Error that ended the turn, if any
    pub const fn error(&self) -> Option<&LlmError> {
        match &self.status {
            TurnStatus::Failed(e) => Some(e),
            TurnStatus::Completed | TurnStatus::Cancelled => None,
        }
    }
}

/// Per-target outcome of a multi-target dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResult {
    /// Configuration label of the target
    pub provider_label: String,
    /// Model the target was asked to use
    pub model_id: String,
    /// Accumulated answer text
    pub text: String,
    /// Accumulated reasoning text
    pub reasoning: String,
    /// Set once the target finished, whatever the outcome
    pub is_complete: bool,
    /// Whether the target was stopped by the caller
    pub cancelled: bool,
    /// Error that ended the target
    pub error: Option<LlmError>,
    /// When the target was dispatched
    pub timestamp: Timestamp,
}

impl AgentResult {
    /// Fresh, incomplete entry for a target
    pub fn pending(provider_label: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_label: provider_label.into(),
            model_id: model_id.into(),
            text: String::new(),
            reasoning: String::new(),
            is_complete: false,
            cancelled: false,
            error: None,
            timestamp: Timestamp::now(),
        }
    }

    /// Freeze the entry with a turn outcome
    pub fn complete(&mut self, outcome: TurnOutcome) {
        if self.is_complete {
            return;
        }
        self.text = outcome.text;
        self.reasoning = outcome.reasoning;
        match outcome.status {
            TurnStatus::Completed => {}
            TurnStatus::Cancelled => self.cancelled = true,
            TurnStatus::Failed(e) => self.error = Some(e),
        }
        self.is_complete = true;
    }

    /// Freeze the entry with an error and no text
    pub fn fail(&mut self, error: LlmError) {
        self.complete(TurnOutcome {
            text: String::new(),
            reasoning: String::new(),
            status: TurnStatus::Failed(error),
        });
    }
}

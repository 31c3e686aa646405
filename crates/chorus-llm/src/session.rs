//! One conversation turn, end to end
//!
//! A turn runs as its own task: it picks streaming or single-shot, routes
//! failures through capability negotiation once, forwards deltas to the
//! caller and settles into exactly one terminal state.
//!
//! ```text
//! Idle -> Sending -> Streaming            -> Completed | Failed | Cancelled
//!                 -> AwaitingFullResponse -> Completed | Failed | Cancelled
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::client::CompletionClient;
use crate::error::LlmError;
use crate::negotiation::should_retry_without_reasoning;
use crate::types::{DeltaRole, GenerationSettings, Message, StreamDelta, TurnOutcome, TurnStatus};

/// Deltas buffered between the turn task and a slow reader
const DELTA_BUFFER: usize = 64;

/// Lifecycle of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Created, not yet started
    Idle,
    /// Request built, waiting for the response head
    Sending,
    /// Receiving deltas
    Streaming,
    /// Waiting for a single-shot body
    AwaitingFullResponse,
    /// Finished successfully
    Completed,
    /// Ended by an error
    Failed,
    /// Stopped by the caller
    Cancelled,
}

impl TurnState {
    /// Whether no further transition can happen
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Streaming or single-shot selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseMode {
    /// Stream when the model supports it
    #[default]
    Auto,
    /// Always stream
    Stream,
    /// Always request one full body
    Single,
}

/// Input for one turn
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Canonical history ending with the new prompt
    pub history: Vec<Message>,
    /// Generation settings
    pub settings: GenerationSettings,
    /// Streaming selection
    pub mode: ResponseMode,
}

impl TurnRequest {
    /// Request with automatic mode selection
    pub fn new(history: Vec<Message>, settings: GenerationSettings) -> Self {
        Self {
            history,
            settings,
            mode: ResponseMode::Auto,
        }
    }

    /// Override the response mode
    #[must_use]
    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Callback run when a turn completes, e.g. to generate a chat title
pub type CompletionHook = Arc<dyn Fn(&TurnOutcome) + Send + Sync>;

/// Cooperative cancellation for a turn or a whole dispatch
///
/// Cancelling is idempotent, and cancelling something that already finished
/// changes nothing.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub(crate) const fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Sends turns for one target
pub struct Session {
    label: String,
    client: CompletionClient,
    on_complete: Option<CompletionHook>,
}

impl Session {
    /// Create a session for a labelled target
    pub fn new(label: impl Into<String>, client: CompletionClient) -> Self {
        Self {
            label: label.into(),
            client,
            on_complete: None,
        }
    }

    /// Register a callback for completed turns
    #[must_use]
    pub fn with_completion_hook(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    /// Target label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Underlying client
    pub const fn client(&self) -> &CompletionClient {
        &self.client
    }

    /// Start a turn on the current Tokio runtime
    pub fn start(&self, request: TurnRequest) -> Turn {
        self.start_linked(request, CancellationToken::new())
    }

    /// Start a turn whose cancellation follows `token`
    pub(crate) fn start_linked(&self, request: TurnRequest, token: CancellationToken) -> Turn {
        let (delta_tx, delta_rx) = mpsc::channel(DELTA_BUFFER);
        let (state_tx, state_rx) = watch::channel(TurnState::Idle);

        let runner = TurnRunner {
            label: self.label.clone(),
            client: self.client.clone(),
            deltas: delta_tx,
            state: state_tx,
            token: token.clone(),
            on_complete: self.on_complete.clone().map(CompletionLatch::new),
            text: String::new(),
            reasoning: String::new(),
        };
        let task = tokio::spawn(runner.run(request));

        Turn {
            deltas: delta_rx,
            state: state_rx,
            abort_on_drop: token.clone().drop_guard(),
            cancel: CancelHandle::new(token),
            task,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("label", &self.label)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Handle to a running turn
///
/// Dropping the handle before the turn ends cancels it.
pub struct Turn {
    deltas: mpsc::Receiver<StreamDelta>,
    state: watch::Receiver<TurnState>,
    cancel: CancelHandle,
    task: JoinHandle<TurnOutcome>,
    abort_on_drop: DropGuard,
}

impl Turn {
    /// Next delta in transport order, or `None` once the turn is over
    pub async fn next_delta(&mut self) -> Option<StreamDelta> {
        if self.cancel.is_cancelled() && !self.state().is_terminal() {
            return None;
        }
        let delta = self.deltas.recv().await?;
        if self.cancel.is_cancelled() && self.state() == TurnState::Cancelled {
            return None;
        }
        Some(delta)
    }

    /// Current state
    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change
    pub fn watch_state(&self) -> watch::Receiver<TurnState> {
        self.state.clone()
    }

    /// Handle that can cancel this turn from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel this turn
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the turn to end, discarding undelivered deltas
    pub async fn finish(self) -> TurnOutcome {
        let Self {
            deltas,
            task,
            abort_on_drop,
            ..
        } = self;
        drop(deltas);

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => TurnOutcome {
                text: String::new(),
                reasoning: String::new(),
                status: TurnStatus::Failed(LlmError::Unknown(format!("turn task failed: {e}"))),
            },
        };
        abort_on_drop.disarm();
        outcome
    }
}

impl std::fmt::Debug for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Turn").field("state", &self.state()).finish_non_exhaustive()
    }
}

/// Runs a completion hook at most once
struct CompletionLatch {
    fired: AtomicBool,
    hook: CompletionHook,
}

impl CompletionLatch {
    fn new(hook: CompletionHook) -> Self {
        Self {
            fired: AtomicBool::new(false),
            hook,
        }
    }

    fn fire(&self, outcome: &TurnOutcome) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            (self.hook)(outcome);
        }
    }
}

/// How one request attempt ended
enum Attempt {
    Done,
    Cancelled,
    Failed { error: LlmError, emitted: bool },
}

struct TurnRunner {
    label: String,
    client: CompletionClient,
    deltas: mpsc::Sender<StreamDelta>,
    state: watch::Sender<TurnState>,
    token: CancellationToken,
    on_complete: Option<CompletionLatch>,
    text: String,
    reasoning: String,
}

impl TurnRunner {
    async fn run(mut self, request: TurnRequest) -> TurnOutcome {
        let streaming = match request.mode {
            ResponseMode::Auto => self.client.supports_streaming(),
            ResponseMode::Stream => true,
            ResponseMode::Single => false,
        };

        let mut settings = request.settings;
        let mut rejected: Option<LlmError> = None;

        let status = loop {
            self.state.send_replace(TurnState::Sending);

            let attempt = if streaming {
                self.stream_attempt(&request.history, &settings).await
            } else {
                self.single_attempt(&request.history, &settings).await
            };

            match attempt {
                Attempt::Done => break TurnStatus::Completed,
                Attempt::Cancelled => break TurnStatus::Cancelled,
                Attempt::Failed { error, emitted } => {
                    if rejected.is_none() && !emitted && should_retry_without_reasoning(&settings, &error) {
                        tracing::warn!(
                            provider = %self.label,
                            model = %self.client.model(),
                            error = %error,
                            "reasoning parameter rejected, retrying without it"
                        );
                        settings = settings.without_reasoning();
                        rejected = Some(error);
                        continue;
                    }
                    if let Some(original) = &rejected {
                        tracing::warn!(
                            provider = %self.label,
                            original = %original,
                            error = %error,
                            "retry without reasoning failed"
                        );
                    }
                    break TurnStatus::Failed(error);
                }
            }
        };

        let terminal = match &status {
            TurnStatus::Completed => TurnState::Completed,
            TurnStatus::Cancelled => TurnState::Cancelled,
            TurnStatus::Failed(_) => TurnState::Failed,
        };

        let outcome = TurnOutcome {
            text: std::mem::take(&mut self.text),
            reasoning: std::mem::take(&mut self.reasoning),
            status,
        };

        self.state.send_replace(terminal);
        if outcome.is_completed()
            && let Some(latch) = &self.on_complete
        {
            latch.fire(&outcome);
        }

        tracing::debug!(provider = %self.label, state = ?terminal, "turn finished");
        outcome
    }

    async fn stream_attempt(&mut self, history: &[Message], settings: &GenerationSettings) -> Attempt {
        let opened = tokio::select! {
            biased;
            () = self.token.cancelled() => return Attempt::Cancelled,
            opened = self.client.stream(history, settings) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(error) => return Attempt::Failed { error, emitted: false },
        };

        self.state.send_replace(TurnState::Streaming);
        let mut emitted = false;

        loop {
            let next = tokio::select! {
                biased;
                () = self.token.cancelled() => return Attempt::Cancelled,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(delta)) => {
                    emitted |= !delta.is_empty();
                    let is_final = delta.is_final;
                    if !self.emit(delta).await {
                        return Attempt::Cancelled;
                    }
                    if is_final {
                        return Attempt::Done;
                    }
                }
                Some(Err(error)) => return Attempt::Failed { error, emitted },
                None => return Attempt::Done,
            }
        }
    }

    async fn single_attempt(&mut self, history: &[Message], settings: &GenerationSettings) -> Attempt {
        self.state.send_replace(TurnState::AwaitingFullResponse);

        let result = tokio::select! {
            biased;
            () = self.token.cancelled() => return Attempt::Cancelled,
            result = self.client.complete(history, settings) => result,
        };
        let completion = match result {
            Ok(completion) => completion,
            Err(error) => return Attempt::Failed { error, emitted: false },
        };

        if let Some(reasoning) = completion.reasoning
            && !self.emit(StreamDelta::reasoning(reasoning)).await
        {
            return Attempt::Cancelled;
        }
        let answer = StreamDelta {
            is_final: true,
            ..StreamDelta::text(completion.text)
        };
        if !self.emit(answer).await {
            return Attempt::Cancelled;
        }

        Attempt::Done
    }

    /// Hand a delta to the caller and record it
    ///
    /// Returns `false` if the turn was cancelled while waiting for buffer
    /// space; the delta is then dropped from the outcome too. A caller that
    /// stopped reading does not stop the turn.
    async fn emit(&mut self, delta: StreamDelta) -> bool {
        let role = delta.role;
        let fragment = delta.text.clone();

        let handed_over = tokio::select! {
            biased;
            () = self.token.cancelled() => false,
            _ = self.deltas.send(delta) => true,
        };
        if handed_over {
            match role {
                DeltaRole::Text => self.text.push_str(&fragment),
                DeltaRole::Reasoning => self.reasoning.push_str(&fragment),
            }
        }
        handed_over
    }
}

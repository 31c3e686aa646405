//! Fan one prompt out to several targets concurrently
//!
//! Each target runs as its own task owning its own `AgentResult`; nothing is
//! shared between tasks except the progress channel and a parent
//! cancellation token. Results are collected with a join in input order.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::error::LlmError;
use crate::session::{CancelHandle, ResponseMode, Session, TurnRequest};
use crate::types::{AgentResult, GenerationSettings, Message, StreamDelta};

/// Most targets one dispatch may address
pub const MAX_TARGETS: usize = 3;

/// Progress events buffered before slow readers apply backpressure
const PROGRESS_BUFFER: usize = 256;

/// Validated set of targets
#[derive(Debug)]
pub struct Dispatcher {
    targets: Vec<Arc<Session>>,
}

impl Dispatcher {
    /// Create a dispatcher over 1..=`MAX_TARGETS` distinct targets
    ///
    /// # Errors
    ///
    /// Returns `NoApiService` for an empty list, too many targets, or a
    /// repeated label
    pub fn new(targets: Vec<Session>) -> Result<Self, LlmError> {
        if targets.is_empty() {
            return Err(LlmError::NoApiService("no target selected".to_owned()));
        }
        if targets.len() > MAX_TARGETS {
            return Err(LlmError::NoApiService(format!(
                "{} targets selected, at most {MAX_TARGETS} are allowed",
                targets.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = targets.iter().find(|t| !seen.insert(t.label().to_owned())) {
            return Err(LlmError::NoApiService(format!(
                "target '{}' selected more than once",
                duplicate.label()
            )));
        }

        Ok(Self {
            targets: targets.into_iter().map(Arc::new).collect(),
        })
    }

    /// Target labels in input order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.label())
    }

    /// Start one turn per target on the current Tokio runtime
    pub fn dispatch(&self, history: Vec<Message>, settings: GenerationSettings, mode: ResponseMode) -> Dispatch {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_BUFFER);

        tracing::info!(
            dispatch_id = %id,
            targets = self.targets.len(),
            labels = ?self.labels().collect::<Vec<_>>(),
            "dispatching prompt"
        );

        let tasks = self
            .targets
            .iter()
            .enumerate()
            .map(|(index, session)| {
                let pending = AgentResult::pending(session.label(), session.client().model());
                let request = TurnRequest::new(history.clone(), settings).with_mode(mode);
                let task = tokio::spawn(run_target(
                    index,
                    Arc::clone(session),
                    request,
                    pending.clone(),
                    token.child_token(),
                    progress_tx.clone(),
                ));
                (pending, task)
            })
            .collect();

        Dispatch {
            id,
            progress: progress_rx,
            abort_on_drop: token.clone().drop_guard(),
            token,
            tasks,
        }
    }
}

async fn run_target(
    index: usize,
    session: Arc<Session>,
    request: TurnRequest,
    mut result: AgentResult,
    token: CancellationToken,
    progress: mpsc::Sender<(usize, StreamDelta)>,
) -> AgentResult {
    let mut turn = session.start_linked(request, token);
    while let Some(delta) = turn.next_delta().await {
        // A caller that stopped listening does not stop the target
        let _ = progress.send((index, delta)).await;
    }
    result.complete(turn.finish().await);

    tracing::debug!(
        provider = %result.provider_label,
        cancelled = result.cancelled,
        failed = result.error.is_some(),
        "target finished"
    );
    result
}

/// A running dispatch
///
/// Dropping it before `join` completes cancels every target.
pub struct Dispatch {
    id: Uuid,
    progress: mpsc::Receiver<(usize, StreamDelta)>,
    token: CancellationToken,
    tasks: Vec<(AgentResult, JoinHandle<AgentResult>)>,
    abort_on_drop: DropGuard,
}

impl Dispatch {
    /// Identifier carried by this dispatch's log events
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Next delta from any target, tagged with the target's input index
    ///
    /// Returns `None` once every target has finished.
    pub async fn next_progress(&mut self) -> Option<(usize, StreamDelta)> {
        self.progress.recv().await
    }

    /// Cancel every target that is still running
    pub fn cancel_all(&self) {
        self.token.cancel();
    }

    /// Handle that cancels every target from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.token.clone())
    }

    /// Wait for every target and return one result per target in input order
    pub async fn join(self) -> Vec<AgentResult> {
        let Self {
            id,
            progress,
            tasks,
            abort_on_drop,
            ..
        } = self;
        drop(progress);

        let mut results = Vec::with_capacity(tasks.len());
        for (mut pending, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    pending.fail(LlmError::Unknown(format!("target task failed: {e}")));
                    pending
                }
            };
            results.push(result);
        }

        let failed = results.iter().filter(|r| r.error.is_some()).count();
        let cancelled = results.iter().filter(|r| r.cancelled).count();
        tracing::info!(
            dispatch_id = %id,
            targets = results.len(),
            failed,
            cancelled,
            "dispatch finished"
        );

        abort_on_drop.disarm();
        results
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("id", &self.id)
            .field("targets", &self.tasks.len())
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

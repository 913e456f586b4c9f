//! Async task sessions on tokio.
//!
//! A [`TaskSession`] owns one [`TaskEngine`] inside a spawned task and is
//! the only thing that ever touches it. Commands arrive over an mpsc
//! channel from a [`SessionHandle`]; timer expiries arrive over a second
//! channel from [`TokioTimers`]. Both are handled one at a time, so the
//! engine never sees two events at once.
//!
//! Dropping every handle, or calling [`SessionHandle::unmount`], stops
//! the session and aborts whatever timer is pending.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use recall_core::engine::{EngineEvent, EngineParts, SessionState, Submission, TaskEngine, TaskObserver};
use recall_core::timer::{Clock, TimerDriver};
use recall_core::{Response, RoundResult, RoundToken, Stimulus, TaskDefinition, TaskId, TaskOutcome, TimerId};
use recall_core::types::Phase;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{HostError, Result};

// ---------------------------------------------------------------------------
// Timers and clock
// ---------------------------------------------------------------------------

/// Timer driver backed by spawned `tokio::time::sleep` tasks.
///
/// Each armed timer is a task that sleeps and then sends its id. Disarming
/// aborts the task, so a cancelled timer never sends.
#[derive(Debug)]
pub struct TokioTimers {
    fired: mpsc::UnboundedSender<TimerId>,
    pending: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioTimers {
    /// Timers delivering expiries to `fired`.
    #[must_use]
    pub fn new(fired: mpsc::UnboundedSender<TimerId>) -> Self {
        Self {
            fired,
            pending: HashMap::new(),
        }
    }
}

impl TimerDriver for TokioTimers {
    fn arm(&mut self, id: TimerId, after: Duration) {
        self.pending.retain(|_, handle| !handle.is_finished());
        let fired = self.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = fired.send(id);
        });
        self.pending.insert(id, handle);
    }

    fn disarm(&mut self, id: TimerId) {
        if let Some(handle) = self.pending.remove(&id) {
            handle.abort();
        }
    }

    fn disarm_all(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        self.disarm_all();
    }
}

/// Clock on tokio's time source, so paused-time tests control it.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    /// A clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What a session reports to its host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Engine notification.
    Engine(EngineEvent),
    /// The finished attempt was stored.
    Recorded {
        /// Score that was saved.
        score: u32,
        /// Level opened by passing, if any.
        unlocked_level: Option<usize>,
    },
    /// Something failed inside the session.
    Failed {
        /// Error description.
        message: String,
    },
}

/// Called with every finished attempt, before its events are delivered.
pub trait OutcomeSink: Send {
    /// Store or otherwise act on `outcome`. Returns the level it opened.
    ///
    /// # Errors
    /// Whatever the sink's backend fails with.
    fn record(&mut self, outcome: &TaskOutcome) -> Result<Option<usize>>;
}

struct ChannelObserver {
    events: mpsc::UnboundedSender<SessionEvent>,
    sink: Option<Box<dyn OutcomeSink>>,
}

impl ChannelObserver {
    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(SessionEvent::Engine(event));
    }
}

impl TaskObserver for ChannelObserver {
    fn on_phase_changed(&mut self, phase: Phase, token: RoundToken) {
        self.emit(EngineEvent::PhaseChanged { phase, token });
    }

    fn on_round_started(&mut self, token: RoundToken, round_index: usize, stimulus: &Stimulus) {
        self.emit(EngineEvent::RoundStarted {
            token,
            round_index,
            stimulus: stimulus.clone(),
        });
    }

    fn on_round_complete(&mut self, result: &RoundResult) {
        self.emit(EngineEvent::RoundComplete(result.clone()));
    }

    fn on_task_complete(&mut self, outcome: &TaskOutcome) {
        self.emit(EngineEvent::TaskComplete(outcome.clone()));
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let event = match sink.record(outcome) {
            Ok(unlocked_level) => SessionEvent::Recorded {
                score: outcome.final_score,
                unlocked_level,
            },
            Err(e) => {
                warn!(task = %outcome.task_id, error = %e, "Failed to record outcome");
                SessionEvent::Failed {
                    message: e.to_string(),
                }
            }
        };
        let _ = self.events.send(event);
    }

    fn on_task_passed(&mut self, task_id: &TaskId) {
        self.emit(EngineEvent::TaskPassed(task_id.clone()));
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

type Reply<T> = oneshot::Sender<Result<T>>;

enum SessionCommand {
    Start(Reply<()>),
    Ready(Reply<bool>),
    Update(RoundToken, Response, Reply<Submission>),
    Submit(RoundToken, Response, Reply<Submission>),
    TryAgain(Reply<()>),
    Snapshot(Reply<SessionState>),
    Unmount,
}

/// Cloneable handle for driving a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| HostError::SessionClosed)?;
        rx.await.map_err(|_| HostError::SessionClosed)?
    }

    /// Begin the attempt.
    ///
    /// # Errors
    /// `SessionClosed`, or the engine's error if it was not idle.
    pub async fn start(&self) -> Result<()> {
        self.request(SessionCommand::Start).await
    }

    /// Done looking / done reading feedback.
    ///
    /// # Errors
    /// `SessionClosed`, or a generator error from the next round.
    pub async fn ready(&self) -> Result<bool> {
        self.request(SessionCommand::Ready).await
    }

    /// Store a partial response.
    ///
    /// # Errors
    /// `SessionClosed`, or a generator error from the next round.
    pub async fn update(&self, token: RoundToken, response: Response) -> Result<Submission> {
        self.request(|tx| SessionCommand::Update(token, response, tx)).await
    }

    /// Submit a response.
    ///
    /// # Errors
    /// `SessionClosed`, or a generator error from the next round.
    pub async fn submit(&self, token: RoundToken, response: Response) -> Result<Submission> {
        self.request(|tx| SessionCommand::Submit(token, response, tx)).await
    }

    /// Reset to idle.
    ///
    /// # Errors
    /// `SessionClosed`.
    pub async fn try_again(&self) -> Result<()> {
        self.request(SessionCommand::TryAgain).await
    }

    /// Copy of the engine's state.
    ///
    /// # Errors
    /// `SessionClosed`.
    pub async fn snapshot(&self) -> Result<SessionState> {
        self.request(SessionCommand::Snapshot).await
    }

    /// Stop the session. Pending timers are cancelled.
    pub async fn unmount(self) {
        let _ = self.commands.send(SessionCommand::Unmount).await;
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A running session: its handle, its event stream and its task.
#[derive(Debug)]
pub struct LaunchedSession {
    /// Command handle.
    pub handle: SessionHandle,
    /// Events, in the order the engine produced them.
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    /// The session task. Completes after unmount.
    pub join: JoinHandle<()>,
}

/// Owns one engine for the lifetime of one mounted task.
pub struct TaskSession {
    engine: TaskEngine,
    commands: mpsc::Receiver<SessionCommand>,
    fired: mpsc::UnboundedReceiver<TimerId>,
}

impl TaskSession {
    /// Spawn a session for `definition` on the current tokio runtime.
    ///
    /// # Errors
    /// Returns the engine's error for an invalid definition.
    pub fn spawn(
        definition: Arc<TaskDefinition>,
        rng: impl RngCore + Send + 'static,
        sink: Option<Box<dyn OutcomeSink>>,
    ) -> Result<LaunchedSession> {
        let (command_tx, commands) = mpsc::channel(32);
        let (fired_tx, fired) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        let parts = EngineParts::new(
            TokioTimers::new(fired_tx),
            Arc::new(TokioClock::new()),
            rng,
            ChannelObserver {
                events: event_tx,
                sink,
            },
        );
        let engine = TaskEngine::new(definition, parts)?;
        info!(task = %engine.definition().id, "Task session mounted");

        let session = Self {
            engine,
            commands,
            fired,
        };
        Ok(LaunchedSession {
            handle: SessionHandle {
                commands: command_tx,
            },
            events,
            join: tokio::spawn(session.run()),
        })
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Unmount) | None => break,
                    Some(command) => self.handle(command),
                },
                Some(id) = self.fired.recv() => {
                    if let Err(e) = self.engine.on_timer(id) {
                        warn!(task = %self.engine.definition().id, timer = %id, error = %e, "Timer transition failed");
                    }
                }
            }
        }
        self.engine.abort();
        info!(task = %self.engine.definition().id, "Task session unmounted");
    }

    fn handle(&mut self, command: SessionCommand) {
        let engine = &mut self.engine;
        match command {
            SessionCommand::Start(reply) => {
                let _ = reply.send(engine.start().map_err(HostError::from));
            }
            SessionCommand::Ready(reply) => {
                let _ = reply.send(engine.signal_ready().map_err(HostError::from));
            }
            SessionCommand::Update(token, response, reply) => {
                let _ = reply.send(engine.update_response(token, response).map_err(HostError::from));
            }
            SessionCommand::Submit(token, response, reply) => {
                let _ = reply.send(engine.submit_response(token, response).map_err(HostError::from));
            }
            SessionCommand::TryAgain(reply) => {
                engine.try_again();
                let _ = reply.send(Ok(()));
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(Ok(engine.state().clone()));
            }
            SessionCommand::Unmount => {
                debug!("Unmount handled by the run loop");
            }
        }
    }
}

//! The task engine: one task attempt as an explicit state machine.
//!
//! ```text
//! start ─► Presenting ──(display timer | ready)──► Memorizing ──(retention)──► AwaitingInput
//!               ▲                                                                   │
//!               │                                   (submit | filled | response limit)
//!               │                                                                   ▼
//!          RoundComplete ◄──(more rounds)── Evaluating ──(last round)──► TaskComplete
//!         (feedback timer | ready)
//! ```
//!
//! The engine is driven from outside: the host forwards user actions
//! (`start`, `signal_ready`, `update_response`, `submit_response`,
//! `try_again`) and timer callbacks (`on_timer`). Each call runs to
//! completion synchronously, so a round is always evaluated before the
//! next one is generated. Nothing in here blocks or performs I/O.
//!
//! Every round gets a fresh [`RoundToken`]. Responses carry the token they
//! were typed against; one that arrives after its round was closed (say,
//! by the response limit) no longer matches and is dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::definition::{SubmitPolicy, TaskDefinition};
use crate::error::{RecallError, Result};
use crate::evaluate::Response;
use crate::scoring::{ResponseTiming, RoundResult, TaskOutcome};
use crate::stimulus::Stimulus;
use crate::timer::{Clock, ManualTimers, SystemClock, TimerDriver};
use crate::types::{Phase, RoundToken, TaskId, TimerId};

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Receives engine notifications. Every method defaults to a no-op.
///
/// Callbacks run synchronously inside the engine call that triggered them.
pub trait TaskObserver: Send {
    /// The engine entered `phase` during round `token`.
    fn on_phase_changed(&mut self, _phase: Phase, _token: RoundToken) {}

    /// A new stimulus is ready to be shown.
    fn on_round_started(&mut self, _token: RoundToken, _round_index: usize, _stimulus: &Stimulus) {}

    /// A round was scored.
    fn on_round_complete(&mut self, _result: &RoundResult) {}

    /// The attempt finished. Fires exactly once per attempt.
    fn on_task_complete(&mut self, _outcome: &TaskOutcome) {}

    /// The attempt finished and met the pass rule.
    fn on_task_passed(&mut self, _task_id: &TaskId) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TaskObserver for NoopObserver {}

/// A recorded observer notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// See [`TaskObserver::on_phase_changed`].
    PhaseChanged {
        /// New phase.
        phase: Phase,
        /// Current round token.
        token: RoundToken,
    },
    /// See [`TaskObserver::on_round_started`].
    RoundStarted {
        /// Token responses must carry.
        token: RoundToken,
        /// Zero-based round index.
        round_index: usize,
        /// What to show.
        stimulus: Stimulus,
    },
    /// See [`TaskObserver::on_round_complete`].
    RoundComplete(RoundResult),
    /// See [`TaskObserver::on_task_complete`].
    TaskComplete(TaskOutcome),
    /// See [`TaskObserver::on_task_passed`].
    TaskPassed(TaskId),
}

/// Observer that records every notification. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl EventLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Take everything recorded so far.
    #[must_use]
    pub fn drain(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, event: EngineEvent) {
        self.events.lock().push(event);
    }
}

impl TaskObserver for EventLog {
    fn on_phase_changed(&mut self, phase: Phase, token: RoundToken) {
        self.push(EngineEvent::PhaseChanged { phase, token });
    }

    fn on_round_started(&mut self, token: RoundToken, round_index: usize, stimulus: &Stimulus) {
        self.push(EngineEvent::RoundStarted {
            token,
            round_index,
            stimulus: stimulus.clone(),
        });
    }

    fn on_round_complete(&mut self, result: &RoundResult) {
        self.push(EngineEvent::RoundComplete(result.clone()));
    }

    fn on_task_complete(&mut self, outcome: &TaskOutcome) {
        self.push(EngineEvent::TaskComplete(outcome.clone()));
    }

    fn on_task_passed(&mut self, task_id: &TaskId) {
        self.push(EngineEvent::TaskPassed(task_id.clone()));
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Everything an engine needs from its host.
pub struct EngineParts {
    /// Timer scheduling.
    pub timers: Box<dyn TimerDriver>,
    /// Time source for response timing.
    pub clock: Arc<dyn Clock>,
    /// Randomness for stimulus generation.
    pub rng: Box<dyn RngCore + Send>,
    /// Notification sink.
    pub observer: Box<dyn TaskObserver>,
}

impl std::fmt::Debug for EngineParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineParts").finish_non_exhaustive()
    }
}

impl EngineParts {
    /// Assemble parts from explicit collaborators.
    #[must_use]
    pub fn new(
        timers: impl TimerDriver + 'static,
        clock: Arc<dyn Clock>,
        rng: impl RngCore + Send + 'static,
        observer: impl TaskObserver + 'static,
    ) -> Self {
        Self {
            timers: Box::new(timers),
            clock,
            rng: Box::new(rng),
            observer: Box::new(observer),
        }
    }

    /// Virtual time and a seeded PRNG: fully reproducible.
    #[must_use]
    pub fn manual(timers: &ManualTimers, seed: u64) -> Self {
        Self::new(
            timers.clone(),
            Arc::new(timers.clone()),
            StdRng::seed_from_u64(seed),
            NoopObserver,
        )
    }

    /// Real clock and an entropy-seeded PRNG around the given timer driver.
    #[must_use]
    pub fn system(timers: impl TimerDriver + 'static) -> Self {
        Self::new(
            timers,
            Arc::new(SystemClock::new()),
            StdRng::from_entropy(),
            NoopObserver,
        )
    }

    /// Replace the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: impl TaskObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Mutable state of one attempt, owned by exactly one engine.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    /// Current phase.
    pub phase: Phase,
    /// Zero-based index of the current round.
    pub round_index: usize,
    /// Token of the current round.
    pub token: RoundToken,
    /// The current round's stimulus.
    pub stimulus: Option<Stimulus>,
    /// Response entered so far in the current round.
    pub user_response: Option<Response>,
    /// Results of every scored round, in order.
    pub round_results: Vec<RoundResult>,
    /// Clock reading when the input window opened.
    pub input_opened_at: Option<Duration>,
}

impl SessionState {
    fn initial(token: RoundToken) -> Self {
        Self {
            phase: Phase::Idle,
            round_index: 0,
            token,
            stimulus: None,
            user_response: None,
            round_results: Vec::new(),
            input_opened_at: None,
        }
    }
}

/// What happened to a response handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
    /// The response closed the round and was scored.
    Accepted,
    /// Partial response stored; the round is still open.
    Buffered,
    /// The token belongs to a round that is already over. Dropped.
    Stale,
    /// Current round, but input is not open (stimulus still showing, etc.). Dropped.
    NotAccepting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPurpose {
    EndPresentation,
    EndRetention,
    ResponseLimit,
    EndFeedback,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    id: TimerId,
    purpose: TimerPurpose,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives one task through its rounds.
pub struct TaskEngine {
    definition: Arc<TaskDefinition>,
    state: SessionState,
    timers: Box<dyn TimerDriver>,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
    observer: Box<dyn TaskObserver>,
    armed: Option<ArmedTimer>,
    next_timer: u64,
    next_token: u64,
    outcome: Option<TaskOutcome>,
}

impl std::fmt::Debug for TaskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEngine")
            .field("task", &self.definition.id)
            .field("phase", &self.state.phase)
            .field("round_index", &self.state.round_index)
            .field("token", &self.state.token)
            .finish_non_exhaustive()
    }
}

impl TaskEngine {
    /// Create an idle engine for `definition`.
    ///
    /// # Errors
    /// Returns `RecallError::InvalidDefinition` if the definition is invalid.
    pub fn new(definition: Arc<TaskDefinition>, parts: EngineParts) -> Result<Self> {
        definition.validate()?;
        Ok(Self {
            definition,
            state: SessionState::initial(RoundToken(0)),
            timers: parts.timers,
            clock: parts.clock,
            rng: parts.rng,
            observer: parts.observer,
            armed: None,
            next_timer: 0,
            next_token: 0,
            outcome: None,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The task being run.
    #[must_use]
    pub fn definition(&self) -> &TaskDefinition {
        &self.definition
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Zero-based index of the current round.
    #[must_use]
    pub fn round_index(&self) -> usize {
        self.state.round_index
    }

    /// Token of the current round.
    #[must_use]
    pub fn token(&self) -> RoundToken {
        self.state.token
    }

    /// The current round's stimulus, once generated.
    #[must_use]
    pub fn stimulus(&self) -> Option<&Stimulus> {
        self.state.stimulus.as_ref()
    }

    /// Full session state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Results of every round scored so far.
    #[must_use]
    pub fn results(&self) -> &[RoundResult] {
        &self.state.round_results
    }

    /// The attempt's outcome, once in [`Phase::TaskComplete`].
    #[must_use]
    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.outcome.as_ref()
    }

    /// Whether a timer is currently armed.
    #[must_use]
    pub fn has_pending_timer(&self) -> bool {
        self.armed.is_some()
    }

    // ------------------------------------------------------------------
    // Host actions
    // ------------------------------------------------------------------

    /// Begin the attempt: generate round 0 and show it.
    ///
    /// # Errors
    /// `InvalidTransition` unless idle; generator errors propagate.
    pub fn start(&mut self) -> Result<()> {
        if self.state.phase != Phase::Idle {
            return Err(RecallError::InvalidTransition {
                action: "start",
                phase: self.state.phase,
            });
        }
        info!(task = %self.definition.id, rounds = self.definition.round_count, "Task attempt started");
        self.begin_round()
    }

    /// The user is done looking (manual presentation) or done reading
    /// feedback. Returns whether it caused a transition.
    ///
    /// # Errors
    /// Generator errors from starting the next round propagate.
    pub fn signal_ready(&mut self) -> Result<bool> {
        match self.state.phase {
            Phase::Presenting if self.armed.is_none() => {
                self.end_presentation();
                Ok(true)
            }
            Phase::RoundComplete => {
                self.advance()?;
                Ok(true)
            }
            phase => {
                debug!(task = %self.definition.id, ?phase, "Ready signal ignored");
                Ok(false)
            }
        }
    }

    /// Store a partial response for round `token`.
    ///
    /// Under [`SubmitPolicy::WhenFilled`] a response holding as many entries
    /// as the answer closes the round.
    ///
    /// # Errors
    /// Generator errors from starting the next round propagate.
    pub fn update_response(&mut self, token: RoundToken, response: Response) -> Result<Submission> {
        if let Some(rejected) = self.check_input(token) {
            return Ok(rejected);
        }
        let filled = self.definition.submit == SubmitPolicy::WhenFilled
            && self
                .state
                .stimulus
                .as_ref()
                .is_some_and(|s| s.answer.filled_by(&response) >= s.expected_len());
        self.state.user_response = Some(response);

        if filled {
            self.complete_input(false)?;
            Ok(Submission::Accepted)
        } else {
            Ok(Submission::Buffered)
        }
    }

    /// Submit the final response for round `token` and score it.
    ///
    /// # Errors
    /// Generator errors from starting the next round propagate.
    pub fn submit_response(&mut self, token: RoundToken, response: Response) -> Result<Submission> {
        if let Some(rejected) = self.check_input(token) {
            return Ok(rejected);
        }
        self.state.user_response = Some(response);
        self.complete_input(false)?;
        Ok(Submission::Accepted)
    }

    /// A timer armed by this engine has elapsed. Unknown and cancelled
    /// timers are ignored.
    ///
    /// # Errors
    /// Generator errors from starting the next round propagate.
    pub fn on_timer(&mut self, id: TimerId) -> Result<()> {
        let Some(armed) = self.armed.filter(|a| a.id == id) else {
            debug!(task = %self.definition.id, timer = %id, "Ignoring stale timer");
            return Ok(());
        };
        self.armed = None;

        match armed.purpose {
            TimerPurpose::EndPresentation => self.end_presentation(),
            TimerPurpose::EndRetention => self.open_input(),
            TimerPurpose::ResponseLimit => {
                debug!(task = %self.definition.id, round = self.state.round_index, "Response limit reached");
                self.complete_input(true)?;
            }
            TimerPurpose::EndFeedback => self.advance()?,
        }
        Ok(())
    }

    /// Throw the attempt away and return to idle with fresh state.
    ///
    /// Any pending timer is cancelled first, and the round token moves on,
    /// so nothing from the abandoned attempt can reach the new one.
    pub fn try_again(&mut self) {
        self.disarm();
        self.reset();
        debug!(task = %self.definition.id, token = %self.state.token, "Attempt reset");
        self.observer.on_phase_changed(Phase::Idle, self.state.token);
    }

    /// Cancel everything without notifying the observer. Used when the host
    /// tears the task down.
    pub fn abort(&mut self) {
        self.disarm();
        self.timers.disarm_all();
        self.reset();
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn check_input(&self, token: RoundToken) -> Option<Submission> {
        if token != self.state.token {
            debug!(task = %self.definition.id, %token, current = %self.state.token, "Stale response dropped");
            return Some(Submission::Stale);
        }
        if self.state.phase != Phase::AwaitingInput {
            debug!(task = %self.definition.id, phase = ?self.state.phase, "Response outside input window");
            return Some(Submission::NotAccepting);
        }
        None
    }

    fn begin_round(&mut self) -> Result<()> {
        let params = self.definition.params_for(self.state.round_index)?;
        let stimulus = self.definition.generator.generate(&params, &mut *self.rng)?;

        self.next_token += 1;
        self.state.token = RoundToken(self.next_token);
        self.state.user_response = None;
        self.state.input_opened_at = None;

        debug!(
            task = %self.definition.id,
            round = self.state.round_index,
            token = %self.state.token,
            load = stimulus.load,
            "Round generated"
        );
        self.observer
            .on_round_started(self.state.token, self.state.round_index, &stimulus);
        self.state.stimulus = Some(stimulus);
        self.set_phase(Phase::Presenting);

        if let Some(display) = self.definition.display_for(&params) {
            self.arm(display, TimerPurpose::EndPresentation);
        }
        Ok(())
    }

    fn end_presentation(&mut self) {
        self.disarm();
        self.set_phase(Phase::Memorizing);
        let retention = self.definition.timing.retention;
        if retention.is_zero() {
            self.open_input();
        } else {
            self.arm(retention, TimerPurpose::EndRetention);
        }
    }

    fn open_input(&mut self) {
        self.set_phase(Phase::AwaitingInput);
        self.state.input_opened_at = Some(self.clock.now());
        if let Some(limit) = self.definition.timing.response_limit {
            self.arm(limit, TimerPurpose::ResponseLimit);
        }
    }

    fn complete_input(&mut self, timed_out: bool) -> Result<()> {
        self.disarm();
        self.set_phase(Phase::Evaluating);

        let now = self.clock.now();
        let timing = ResponseTiming {
            start: self.state.input_opened_at.unwrap_or(now),
            end: now,
        };
        let response = self
            .state
            .user_response
            .clone()
            .unwrap_or_else(Response::empty);
        let Some(stimulus) = self.state.stimulus.as_ref() else {
            return Err(RecallError::InvalidTransition {
                action: "evaluate without a stimulus",
                phase: self.state.phase,
            });
        };

        let mut result = self.definition.evaluator.evaluate(
            self.state.round_index,
            &response,
            &stimulus.answer,
            timing,
            &self.definition.scoring,
        );
        result.timed_out = timed_out;

        debug!(
            task = %self.definition.id,
            round = result.round_index,
            correct = result.correct,
            score = result.score,
            timed_out,
            "Round scored"
        );
        self.observer.on_round_complete(&result);
        self.state.round_results.push(result);

        if self.state.round_index + 1 < self.definition.round_count {
            self.set_phase(Phase::RoundComplete);
            match self.definition.timing.feedback {
                Some(pause) if !pause.is_zero() => self.arm(pause, TimerPurpose::EndFeedback),
                _ => self.advance()?,
            }
        } else {
            self.finish();
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        self.disarm();
        self.state.round_index += 1;
        self.begin_round()
    }

    fn finish(&mut self) {
        let outcome = TaskOutcome::aggregate(
            self.definition.id.clone(),
            self.definition.pass_rule,
            self.state.round_results.clone(),
        );
        self.set_phase(Phase::TaskComplete);

        info!(
            task = %self.definition.id,
            passed = outcome.passed,
            final_score = outcome.final_score,
            correct_rounds = outcome.correct_rounds,
            "Task attempt complete"
        );
        self.observer.on_task_complete(&outcome);
        if outcome.passed {
            self.observer.on_task_passed(&self.definition.id);
        }
        self.outcome = Some(outcome);
    }

    fn reset(&mut self) {
        self.next_token += 1;
        self.state = SessionState::initial(RoundToken(self.next_token));
        self.outcome = None;
    }

    fn set_phase(&mut self, phase: Phase) {
        self.state.phase = phase;
        self.observer.on_phase_changed(phase, self.state.token);
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn arm(&mut self, after: Duration, purpose: TimerPurpose) {
        self.disarm();
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        self.timers.arm(id, after);
        self.armed = Some(ArmedTimer { id, purpose });
    }

    fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            self.timers.disarm(armed.id);
        }
    }
}

impl Drop for TaskEngine {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Difficulty, Presentation, TaskTiming};
    use crate::evaluate::PositionalMatch;
    use crate::scoring::PassRule;
    use crate::stimulus::{Answer, ColorSequence, SymbolSequence};
    use crate::types::RoundParams;

    fn definition(timing: TaskTiming, submit: SubmitPolicy) -> Arc<TaskDefinition> {
        Arc::new(
            TaskDefinition::builder("digit-span", SymbolSequence::digits(), PositionalMatch)
                .rounds(3)
                .pass_rule(PassRule::MinCorrectRounds(2))
                .difficulty(Difficulty::fixed(RoundParams::load(5)))
                .timing(timing)
                .submit(submit)
                .build()
                .expect("valid definition"),
        )
    }

    fn manual_engine(timing: TaskTiming, submit: SubmitPolicy) -> (TaskEngine, ManualTimers, EventLog) {
        let timers = ManualTimers::new();
        let log = EventLog::new();
        let engine = TaskEngine::new(
            definition(timing, submit),
            EngineParts::manual(&timers, 42).with_observer(log.clone()),
        )
        .expect("engine");
        (engine, timers, log)
    }

    fn answer_text(engine: &TaskEngine) -> String {
        match &engine.stimulus().expect("stimulus").answer {
            Answer::Text(text) => text.clone(),
            other => panic!("unexpected answer {other:?}"),
        }
    }

    #[test]
    fn manual_flow_walks_every_phase() {
        let (mut engine, _timers, log) = manual_engine(TaskTiming::default(), SubmitPolicy::Explicit);
        engine.start().expect("start");
        assert_eq!(engine.phase(), Phase::Presenting);

        assert!(engine.signal_ready().expect("ready"));
        assert_eq!(engine.phase(), Phase::AwaitingInput);

        let token = engine.token();
        let answer = answer_text(&engine);
        assert_eq!(
            engine.submit_response(token, Response::Text(answer)).expect("submit"),
            Submission::Accepted
        );
        assert_eq!(engine.round_index(), 1);
        assert_eq!(engine.phase(), Phase::Presenting);

        let phases: Vec<Phase> = log
            .snapshot()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::PhaseChanged { phase, .. } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                Phase::Presenting,
                Phase::Memorizing,
                Phase::AwaitingInput,
                Phase::Evaluating,
                Phase::RoundComplete,
                Phase::Presenting,
            ]
        );
    }

    #[test]
    fn start_twice_is_a_contract_violation() {
        let (mut engine, _timers, _log) = manual_engine(TaskTiming::default(), SubmitPolicy::Explicit);
        engine.start().expect("start");
        let err = engine.start().expect_err("second start");
        assert!(matches!(err, RecallError::InvalidTransition { action: "start", .. }));
    }

    #[test]
    fn response_before_input_window_is_not_accepted() {
        let (mut engine, _timers, _log) = manual_engine(TaskTiming::default(), SubmitPolicy::Explicit);
        engine.start().expect("start");
        let token = engine.token();
        assert_eq!(
            engine.submit_response(token, Response::Text("1".into())).expect("submit"),
            Submission::NotAccepting
        );
        assert_eq!(engine.phase(), Phase::Presenting);
    }

    #[test]
    fn timed_presentation_and_retention() {
        let timing = TaskTiming {
            presentation: Presentation::Timed(Duration::from_secs(5)),
            retention: Duration::from_secs(2),
            ..TaskTiming::default()
        };
        let (mut engine, timers, _log) = manual_engine(timing, SubmitPolicy::Explicit);
        engine.start().expect("start");

        // Ready is ignored while a display timer runs.
        assert!(!engine.signal_ready().expect("ready"));

        timers.advance(Duration::from_secs(5), |id| engine.on_timer(id)).expect("advance");
        assert_eq!(engine.phase(), Phase::Memorizing);

        timers.advance(Duration::from_secs(2), |id| engine.on_timer(id)).expect("advance");
        assert_eq!(engine.phase(), Phase::AwaitingInput);
        assert_eq!(engine.state().input_opened_at, Some(Duration::from_secs(7)));
    }

    #[test]
    fn filled_input_auto_submits() {
        let (mut engine, _timers, _log) = manual_engine(TaskTiming::default(), SubmitPolicy::WhenFilled);
        engine.start().expect("start");
        engine.signal_ready().expect("ready");

        let token = engine.token();
        let answer = answer_text(&engine);
        assert_eq!(
            engine.update_response(token, Response::Text(answer[..3].to_string())).expect("update"),
            Submission::Buffered
        );
        assert_eq!(
            engine.update_response(token, Response::Text(answer)).expect("update"),
            Submission::Accepted
        );
        assert_eq!(engine.results().len(), 1);
        assert!(engine.results()[0].correct);
    }

    #[test]
    fn partial_color_list_stays_buffered() {
        let definition = Arc::new(
            TaskDefinition::builder("color-sequence", ColorSequence::default(), PositionalMatch)
                .difficulty(Difficulty::fixed(RoundParams::load(3)))
                .submit(SubmitPolicy::WhenFilled)
                .build()
                .expect("valid definition"),
        );
        let timers = ManualTimers::new();
        let mut engine = TaskEngine::new(definition, EngineParts::manual(&timers, 8)).expect("engine");
        engine.start().expect("start");
        engine.signal_ready().expect("ready");

        let token = engine.token();
        let Some(Answer::Ordered(colors)) = engine.stimulus().map(|s| s.answer.clone()) else {
            panic!("expected an ordered answer");
        };
        assert_eq!(
            engine.update_response(token, Response::Text(colors[0].clone())).expect("update"),
            Submission::Buffered
        );
        assert!(engine.results().is_empty());

        assert_eq!(
            engine.update_response(token, Response::Text(colors.join(", "))).expect("update"),
            Submission::Accepted
        );
        assert!(engine.results()[0].correct);
    }

    #[test]
    fn timeout_scores_partial_response_and_drops_late_submit() {
        let timing = TaskTiming {
            response_limit: Some(Duration::from_secs(10)),
            ..TaskTiming::default()
        };
        let (mut engine, timers, _log) = manual_engine(timing, SubmitPolicy::Explicit);
        engine.start().expect("start");
        engine.signal_ready().expect("ready");

        let token = engine.token();
        let answer = answer_text(&engine);
        engine
            .update_response(token, Response::Text(answer[..2].to_string()))
            .expect("update");

        timers.advance(Duration::from_secs(10), |id| engine.on_timer(id)).expect("advance");

        let result = &engine.results()[0];
        assert!(result.timed_out);
        assert!(!result.correct);
        assert_eq!(result.correct_items, 2);
        assert_eq!(engine.round_index(), 1);

        assert_eq!(
            engine.submit_response(token, Response::Text(answer)).expect("late"),
            Submission::Stale
        );
        assert_eq!(engine.results().len(), 1);
    }

    #[test]
    fn feedback_pause_then_advance() {
        let timing = TaskTiming {
            feedback: Some(Duration::from_millis(1500)),
            ..TaskTiming::default()
        };
        let (mut engine, timers, _log) = manual_engine(timing, SubmitPolicy::Explicit);
        engine.start().expect("start");
        engine.signal_ready().expect("ready");
        let token = engine.token();
        engine.submit_response(token, Response::empty()).expect("submit");
        assert_eq!(engine.phase(), Phase::RoundComplete);

        timers
            .advance(Duration::from_millis(1500), |id| engine.on_timer(id))
            .expect("advance");
        assert_eq!(engine.phase(), Phase::Presenting);
        assert_eq!(engine.round_index(), 1);
    }

    #[test]
    fn try_again_cancels_pending_timer() {
        let timing = TaskTiming {
            response_limit: Some(Duration::from_secs(10)),
            ..TaskTiming::default()
        };
        let (mut engine, timers, log) = manual_engine(timing, SubmitPolicy::Explicit);
        engine.start().expect("start");
        engine.signal_ready().expect("ready");
        assert_eq!(timers.armed(), 1);

        engine.try_again();
        assert_eq!(timers.armed(), 0);
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.results().is_empty());

        let _ = log.drain();
        timers.advance(Duration::from_secs(30), |id| engine.on_timer(id)).expect("advance");
        assert!(log.snapshot().is_empty(), "no stale timer may reach the new attempt");
    }

    #[test]
    fn drop_releases_timer() {
        let timing = TaskTiming {
            presentation: Presentation::Timed(Duration::from_secs(5)),
            ..TaskTiming::default()
        };
        let (mut engine, timers, _log) = manual_engine(timing, SubmitPolicy::Explicit);
        engine.start().expect("start");
        assert_eq!(timers.armed(), 1);
        drop(engine);
        assert_eq!(timers.armed(), 0);
    }
}

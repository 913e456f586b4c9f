//! Engine scenarios: complete attempts driven end to end under virtual time.
//!
//! Every test here runs on [`ManualTimers`] with a seeded PRNG, so each
//! scenario is fully reproducible.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::RngCore;

use recall_core::definition::{Difficulty, Presentation, SubmitPolicy, TaskDefinition, TaskTiming};
use recall_core::engine::{EngineEvent, EngineParts, EventLog, Submission, TaskEngine};
use recall_core::evaluate::{Evaluator, PositionalMatch, Response, UnorderedRecall};
use recall_core::scoring::{PassRule, ResponseTiming, ScoreBlend};
use recall_core::stimulus::{Answer, Payload, Stimulus, StimulusGenerator, SymbolSequence};
use recall_core::timer::ManualTimers;
use recall_core::types::{Phase, RoundParams};
use recall_core::{Catalog, RecallConfig, RecallError};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Hands out a fixed list of digit strings, one per round.
#[derive(Debug)]
struct Scripted {
    rounds: Mutex<VecDeque<&'static str>>,
}

impl Scripted {
    fn new(rounds: &[&'static str]) -> Self {
        Self {
            rounds: Mutex::new(rounds.iter().copied().collect()),
        }
    }
}

impl StimulusGenerator for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn validate(&self, _params: &RoundParams) -> recall_core::Result<()> {
        Ok(())
    }

    fn generate(&self, params: &RoundParams, _rng: &mut dyn RngCore) -> recall_core::Result<Stimulus> {
        let digits = self.rounds.lock().pop_front().unwrap_or("00000");
        Ok(Stimulus {
            payload: Payload::Symbols {
                symbols: digits.chars().collect(),
            },
            answer: Answer::Text(digits.to_string()),
            load: params.load,
        })
    }
}

fn engine_for(definition: TaskDefinition, seed: u64) -> (TaskEngine, ManualTimers, EventLog) {
    let timers = ManualTimers::new();
    let log = EventLog::new();
    let engine = TaskEngine::new(
        Arc::new(definition),
        EngineParts::manual(&timers, seed).with_observer(log.clone()),
    )
    .expect("engine");
    (engine, timers, log)
}

fn count_completions(log: &EventLog) -> usize {
    log.snapshot()
        .iter()
        .filter(|e| matches!(e, EngineEvent::TaskComplete(_)))
        .count()
}

fn play_round(engine: &mut TaskEngine, response: &str) -> Submission {
    assert!(engine.signal_ready().expect("ready"));
    assert_eq!(engine.phase(), Phase::AwaitingInput);
    let token = engine.token();
    engine
        .submit_response(token, Response::Text(response.to_string()))
        .expect("submit")
}

// ---------------------------------------------------------------------------
// Digit span: 3 rounds, 2 correct, pass
// ---------------------------------------------------------------------------

#[test]
fn digit_span_two_of_three_passes() {
    let definition = TaskDefinition::builder("digit-span", Scripted::new(&["48213", "90217", "31415"]), PositionalMatch)
        .rounds(3)
        .pass_rule(PassRule::MinCorrectRounds(2))
        .difficulty(Difficulty::fixed(RoundParams::load(5)))
        .build()
        .expect("definition");
    let (mut engine, _timers, log) = engine_for(definition, 1);
    engine.start().expect("start");

    assert_eq!(play_round(&mut engine, "48213"), Submission::Accepted);
    let first = &engine.results()[0];
    assert!(first.correct);
    assert_eq!(first.score, 100);

    assert_eq!(play_round(&mut engine, "90218"), Submission::Accepted);
    let second = &engine.results()[1];
    assert!(!second.correct);
    assert_eq!(second.correct_items, 4);
    assert_eq!(second.metrics.accuracy, 80);

    assert_eq!(play_round(&mut engine, "31415"), Submission::Accepted);

    assert_eq!(engine.phase(), Phase::TaskComplete);
    let outcome = engine.outcome().expect("outcome");
    assert!(outcome.passed);
    assert_eq!(outcome.correct_rounds, 2);
    assert_eq!(outcome.round_results.len(), 3);
    assert_eq!(outcome.final_score, 93);

    assert_eq!(count_completions(&log), 1);
    assert!(log
        .snapshot()
        .iter()
        .any(|e| matches!(e, EngineEvent::TaskPassed(id) if id.as_str() == "digit-span")));
}

#[test]
fn category_recall_two_of_three_scores_67() {
    let expected = Answer::Words(vec!["Apple".into(), "Banana".into(), "Orange".into()]);
    let response = Response::Items(vec!["banana".into(), "ORANGE".into(), "grape".into()]);

    let result = UnorderedRecall::default().evaluate(
        0,
        &response,
        &expected,
        ResponseTiming::instant(),
        &ScoreBlend::accuracy_only(),
    );
    assert_eq!(result.correct_items, 2);
    assert_eq!(result.score, 67);
    assert!(!result.correct);
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[test]
fn unanswered_rounds_time_out_and_complete() {
    let definition = TaskDefinition::builder("timed-digits", SymbolSequence::digits(), PositionalMatch)
        .rounds(3)
        .pass_rule(PassRule::MinCorrectRounds(1))
        .difficulty(Difficulty::fixed(RoundParams::load(5)))
        .timing(TaskTiming {
            presentation: Presentation::Timed(Duration::from_secs(3)),
            retention: Duration::from_secs(1),
            response_limit: Some(Duration::from_secs(20)),
            feedback: Some(Duration::from_millis(1500)),
        })
        .build()
        .expect("definition");
    let (mut engine, timers, log) = engine_for(definition, 9);
    engine.start().expect("start");

    // Far more virtual time than three rounds need.
    timers
        .advance(Duration::from_secs(600), |id| engine.on_timer(id))
        .expect("advance");

    assert_eq!(engine.phase(), Phase::TaskComplete);
    assert_eq!(engine.results().len(), 3);
    assert!(engine.results().iter().all(|r| r.timed_out && !r.correct));
    assert!(!engine.outcome().expect("outcome").passed);
    assert_eq!(count_completions(&log), 1);
    assert!(!engine.has_pending_timer());
    assert_eq!(timers.armed(), 0);
}

#[test]
fn response_elapsed_time_is_measured_from_input_open() {
    let definition = TaskDefinition::builder("digits", SymbolSequence::digits(), PositionalMatch)
        .difficulty(Difficulty::fixed(RoundParams::load(4)))
        .timing(TaskTiming {
            presentation: Presentation::Timed(Duration::from_secs(2)),
            ..TaskTiming::default()
        })
        .build()
        .expect("definition");
    let (mut engine, timers, _log) = engine_for(definition, 4);
    engine.start().expect("start");
    timers
        .advance(Duration::from_secs(2), |id| engine.on_timer(id))
        .expect("advance");
    assert_eq!(engine.phase(), Phase::AwaitingInput);

    timers
        .advance(Duration::from_millis(3250), |id| engine.on_timer(id))
        .expect("advance");
    let token = engine.token();
    engine.submit_response(token, Response::empty()).expect("submit");
    assert_eq!(engine.results()[0].elapsed_ms, 3250);
}

// ---------------------------------------------------------------------------
// Stale events, reset and teardown
// ---------------------------------------------------------------------------

#[test]
fn response_for_previous_round_is_stale() {
    let definition = TaskDefinition::builder("digits", SymbolSequence::digits(), PositionalMatch)
        .rounds(2)
        .difficulty(Difficulty::fixed(RoundParams::load(4)))
        .build()
        .expect("definition");
    let (mut engine, _timers, _log) = engine_for(definition, 2);
    engine.start().expect("start");
    engine.signal_ready().expect("ready");
    let old = engine.token();
    engine.submit_response(old, Response::empty()).expect("submit");

    engine.signal_ready().expect("ready");
    assert_ne!(engine.token(), old);
    assert_eq!(
        engine.submit_response(old, Response::Text("1234".into())).expect("stale"),
        Submission::Stale
    );
    assert_eq!(engine.results().len(), 1);
    assert_eq!(engine.phase(), Phase::AwaitingInput);
}

#[test]
fn try_again_after_completion_starts_fresh() {
    let definition = TaskDefinition::builder("digits", SymbolSequence::digits(), PositionalMatch)
        .difficulty(Difficulty::fixed(RoundParams::load(3)))
        .build()
        .expect("definition");
    let (mut engine, _timers, log) = engine_for(definition, 5);
    engine.start().expect("start");
    engine.signal_ready().expect("ready");
    let first_token = engine.token();
    engine.submit_response(first_token, Response::empty()).expect("submit");
    assert_eq!(engine.phase(), Phase::TaskComplete);

    engine.try_again();
    assert_eq!(engine.phase(), Phase::Idle);
    assert!(engine.outcome().is_none());
    assert!(engine.results().is_empty());
    assert_eq!(engine.round_index(), 0);

    engine.start().expect("restart");
    assert!(engine.token() > first_token);
    assert_eq!(count_completions(&log), 1);
}

#[test]
fn abort_releases_every_timer() {
    let definition = TaskDefinition::builder("digits", SymbolSequence::digits(), PositionalMatch)
        .difficulty(Difficulty::fixed(RoundParams::load(3)))
        .timing(TaskTiming {
            presentation: Presentation::Timed(Duration::from_secs(3)),
            ..TaskTiming::default()
        })
        .build()
        .expect("definition");
    let (mut engine, timers, log) = engine_for(definition, 6);
    engine.start().expect("start");
    assert_eq!(timers.armed(), 1);

    engine.abort();
    assert_eq!(timers.armed(), 0);
    let before = log.snapshot().len();
    timers
        .advance(Duration::from_secs(60), |id| engine.on_timer(id))
        .expect("advance");
    assert_eq!(log.snapshot().len(), before);
    assert_eq!(engine.phase(), Phase::Idle);
}

#[test]
fn invalid_definition_is_fatal_at_construction() {
    let mut definition = TaskDefinition::builder("digits", SymbolSequence::digits(), PositionalMatch)
        .build()
        .expect("definition");
    definition.round_count = 0;

    let timers = ManualTimers::new();
    let err = TaskEngine::new(Arc::new(definition), EngineParts::manual(&timers, 0)).expect_err("invalid");
    assert!(matches!(err, RecallError::InvalidDefinition { .. }));
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn same_seed_same_stimuli() {
    let catalog = Catalog::standard(&RecallConfig::default()).expect("catalog");
    for task in catalog.iter() {
        let run = |seed| {
            let timers = ManualTimers::new();
            let mut engine =
                TaskEngine::new(Arc::clone(task), EngineParts::manual(&timers, seed)).expect("engine");
            engine.start().expect("start");
            engine.stimulus().cloned().expect("stimulus")
        };
        assert_eq!(run(77), run(77), "{}", task.id);
    }
}

#[test]
fn when_filled_closes_round_without_submit() {
    let definition = TaskDefinition::builder("digits", Scripted::new(&["2718"]), PositionalMatch)
        .difficulty(Difficulty::fixed(RoundParams::load(4)))
        .submit(SubmitPolicy::WhenFilled)
        .build()
        .expect("definition");
    let (mut engine, _timers, _log) = engine_for(definition, 0);
    engine.start().expect("start");
    engine.signal_ready().expect("ready");
    let token = engine.token();

    for (typed, expected) in [("2", Submission::Buffered), ("27 1", Submission::Buffered), ("2718", Submission::Accepted)] {
        assert_eq!(
            engine.update_response(token, Response::Text(typed.into())).expect("update"),
            expected
        );
    }
    assert_eq!(engine.phase(), Phase::TaskComplete);
    assert!(engine.outcome().expect("outcome").passed);
}

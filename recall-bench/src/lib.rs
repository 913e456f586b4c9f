//! Shared fixtures for the RECALL benchmarks.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use recall_core::engine::{EngineParts, TaskEngine};
use recall_core::types::Phase;
use recall_core::{Catalog, ManualTimers, RecallConfig, Stimulus, TaskDefinition, TaskOutcome};

/// The standard catalog with default settings.
///
/// # Panics
/// Never with the default configuration.
#[must_use]
pub fn standard_catalog() -> Catalog {
    Catalog::standard(&RecallConfig::default()).expect("default catalog is valid")
}

/// A stimulus for round 0 of `definition`.
///
/// # Panics
/// If the definition cannot generate, which a built definition never does.
#[must_use]
pub fn sample_stimulus(definition: &TaskDefinition, seed: u64) -> Stimulus {
    let params = definition.params_for(0).expect("round 0 params");
    definition
        .generator
        .generate(&params, &mut StdRng::seed_from_u64(seed))
        .expect("generate")
}

/// Play a whole attempt under virtual time, answering every round
/// perfectly the moment input opens.
///
/// # Panics
/// On any engine error.
#[must_use]
pub fn play_perfect_attempt(definition: &Arc<TaskDefinition>, seed: u64) -> TaskOutcome {
    let timers = ManualTimers::new();
    let mut engine =
        TaskEngine::new(Arc::clone(definition), EngineParts::manual(&timers, seed)).expect("engine");
    engine.start().expect("start");

    while engine.phase() != Phase::TaskComplete {
        match engine.phase() {
            Phase::AwaitingInput => {
                let response = engine.stimulus().expect("stimulus").answer.as_response();
                let token = engine.token();
                engine.submit_response(token, response).expect("submit");
            }
            _ => {
                if !engine.signal_ready().expect("ready") {
                    let step = timers.next_deadline().expect("a timer is armed").saturating_sub(
                        recall_core::Clock::now(&timers),
                    );
                    timers.advance(step, |id| engine.on_timer(id)).expect("advance");
                }
            }
        }
    }
    engine.outcome().cloned().expect("outcome")
}

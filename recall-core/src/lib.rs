//! # RECALL Core Library
//!
//! Game-agnostic engine for short memory tasks: show a stimulus, hide it,
//! collect the user's recall, score it, repeat for a fixed number of
//! rounds, then decide pass or fail.
//!
//! - **Generators** produce a [`Stimulus`] and its expected [`Answer`]
//!   for a round's [`RoundParams`].
//! - **Evaluators** compare a [`Response`] with the answer and yield a
//!   [`Judgement`], which a [`ScoreBlend`] turns into a [`RoundResult`].
//! - A [`TaskDefinition`] bundles both with a round schedule, timings and
//!   a [`PassRule`].
//! - The [`TaskEngine`] runs one attempt as a state machine over
//!   [`Phase`]s, driven by host actions and [`TimerDriver`] callbacks.
//!
//! Nothing in this crate performs I/O beyond reading a config file.
//! Randomness and time are injected, so every attempt can be replayed
//! from a seed under [`ManualTimers`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod catalog;
pub mod config;
pub mod definition;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod scoring;
pub mod stimulus;
pub mod timer;
pub mod types;

pub use catalog::Catalog;
pub use config::RecallConfig;
pub use definition::{Difficulty, Presentation, SubmitPolicy, TaskDefinition, TaskTiming};
pub use engine::{EngineEvent, EngineParts, EventLog, SessionState, Submission, TaskEngine, TaskObserver};
pub use error::{RecallError, Result};
pub use evaluate::{Evaluator, Judgement, Response};
pub use scoring::{PassRule, ResponseTiming, ResultRecord, RoundResult, ScoreBlend, SpeedCurve, TaskOutcome};
pub use stimulus::{Answer, Payload, Stimulus, StimulusGenerator};
pub use timer::{Clock, ManualTimers, SystemClock, TimerDriver};
pub use types::*;

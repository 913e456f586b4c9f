//! Task definitions: the static description of one task type.
//!
//! A definition bundles a generator, an evaluator, the round schedule and
//! the pass rule. It is validated once, when built; an engine can then run
//! it without re-checking anything.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecallError, Result};
use crate::evaluate::Evaluator;
use crate::scoring::{PassRule, ScoreBlend};
use crate::stimulus::StimulusGenerator;
use crate::types::{RoundParams, TaskId};

/// Round index → generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Difficulty {
    /// Every round uses the same parameters.
    Fixed {
        /// The parameters.
        params: RoundParams,
    },
    /// Load grows by `step` each round, capped at `max_load`.
    Ramp {
        /// Round 0 parameters.
        base: RoundParams,
        /// Load added per round.
        step: usize,
        /// Upper bound on load.
        max_load: usize,
    },
    /// Explicit per-round parameters; rounds past the end reuse the last row.
    Table {
        /// One row per round.
        rows: Vec<RoundParams>,
    },
}

impl Difficulty {
    /// Fixed parameters.
    #[must_use]
    pub fn fixed(params: RoundParams) -> Self {
        Self::Fixed { params }
    }

    /// Linear load ramp.
    #[must_use]
    pub fn ramp(base: RoundParams, step: usize, max_load: usize) -> Self {
        Self::Ramp {
            base,
            step,
            max_load,
        }
    }

    /// Parameters for `round_index`, or `None` for an empty table.
    #[must_use]
    pub fn params_for(&self, round_index: usize) -> Option<RoundParams> {
        match self {
            Self::Fixed { params } => Some(*params),
            Self::Ramp {
                base,
                step,
                max_load,
            } => {
                let load = base
                    .load
                    .saturating_add(step.saturating_mul(round_index))
                    .min((*max_load).max(base.load));
                Some(RoundParams { load, ..*base })
            }
            Self::Table { rows } => rows.get(round_index).or_else(|| rows.last()).copied(),
        }
    }
}

/// How the presenting phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "duration", rename_all = "snake_case")]
pub enum Presentation {
    /// After a fixed time (a round's `display` overrides it).
    Timed(Duration),
    /// When the user signals they are ready.
    Manual,
}

/// When an in-progress response counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPolicy {
    /// Only on explicit submit.
    #[default]
    Explicit,
    /// As soon as the response holds as many entries as the answer.
    WhenFilled,
}

/// Timing of each round's phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTiming {
    /// How the stimulus display ends.
    pub presentation: Presentation,
    /// Blank interval between hiding the stimulus and opening input.
    pub retention: Duration,
    /// Hard limit on the input window.
    pub response_limit: Option<Duration>,
    /// Pause on the round result before the next round.
    pub feedback: Option<Duration>,
}

impl Default for TaskTiming {
    fn default() -> Self {
        Self {
            presentation: Presentation::Manual,
            retention: Duration::ZERO,
            response_limit: None,
            feedback: None,
        }
    }
}

/// Static description of one task type.
#[derive(Clone)]
pub struct TaskDefinition {
    /// Stable identifier.
    pub id: TaskId,
    /// Display title.
    pub title: String,
    /// Rounds per attempt.
    pub round_count: usize,
    /// What counts as passing.
    pub pass_rule: PassRule,
    /// Round → generation parameters.
    pub difficulty: Difficulty,
    /// Phase timings.
    pub timing: TaskTiming,
    /// Response completion policy.
    pub submit: SubmitPolicy,
    /// Round score weighting.
    pub scoring: ScoreBlend,
    /// Only available with a premium subscription.
    pub premium: bool,
    /// Stimulus generator.
    pub generator: Arc<dyn StimulusGenerator>,
    /// Response evaluator.
    pub evaluator: Arc<dyn Evaluator>,
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("id", &self.id)
            .field("round_count", &self.round_count)
            .field("pass_rule", &self.pass_rule)
            .field("generator", &self.generator.name())
            .field("evaluator", &self.evaluator.name())
            .finish_non_exhaustive()
    }
}

impl TaskDefinition {
    /// Start building a definition.
    pub fn builder(
        id: impl Into<String>,
        generator: impl StimulusGenerator + 'static,
        evaluator: impl Evaluator + 'static,
    ) -> TaskDefinitionBuilder {
        let id = TaskId::new(id);
        TaskDefinitionBuilder {
            definition: Self {
                title: id.0.clone(),
                id,
                round_count: 1,
                pass_rule: PassRule::MinCorrectRounds(1),
                difficulty: Difficulty::fixed(RoundParams::load(1)),
                timing: TaskTiming::default(),
                submit: SubmitPolicy::Explicit,
                scoring: ScoreBlend::default(),
                premium: false,
                generator: Arc::new(generator),
                evaluator: Arc::new(evaluator),
            },
        }
    }

    /// Generation parameters for `round_index`.
    ///
    /// # Errors
    /// Returns `RecallError::InvalidDefinition` if the difficulty table is empty.
    pub fn params_for(&self, round_index: usize) -> Result<RoundParams> {
        self.difficulty
            .params_for(round_index)
            .ok_or_else(|| self.invalid("difficulty table is empty"))
    }

    /// How long the stimulus stays up in `params`' round, or `None` for manual advance.
    #[must_use]
    pub fn display_for(&self, params: &RoundParams) -> Option<Duration> {
        match self.timing.presentation {
            Presentation::Timed(default) => Some(params.display.unwrap_or(default)),
            Presentation::Manual => None,
        }
    }

    /// Check every invariant a running engine relies on.
    ///
    /// # Errors
    /// Returns `RecallError::InvalidDefinition` naming the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.id.0.trim().is_empty() {
            return Err(self.invalid("id is empty"));
        }
        if self.round_count == 0 {
            return Err(self.invalid("round count must be at least 1"));
        }
        match self.pass_rule {
            PassRule::MinCorrectRounds(n) if n > self.round_count => {
                return Err(self.invalid(format!(
                    "needs {n} correct rounds but only {} are played",
                    self.round_count
                )));
            }
            PassRule::MinMeanScore(score) if score > 100 => {
                return Err(self.invalid(format!("mean score threshold {score} exceeds 100")));
            }
            _ => {}
        }
        if let Difficulty::Ramp { base, max_load, .. } = &self.difficulty {
            if *max_load < base.load {
                return Err(self.invalid("ramp max load is below its base load"));
            }
        }
        if let Presentation::Timed(d) = self.timing.presentation {
            if d.is_zero() {
                return Err(self.invalid("timed presentation needs a non-zero duration"));
            }
        }
        if self.timing.response_limit.is_some_and(|d| d.is_zero()) {
            return Err(self.invalid("response limit must be non-zero"));
        }
        self.scoring
            .validate()
            .map_err(|e| self.invalid(e.to_string()))?;

        for round in 0..self.round_count {
            let params = self.params_for(round)?;
            self.generator
                .validate(&params)
                .map_err(|e| self.invalid(format!("round {round}: {e}")))?;
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> RecallError {
        RecallError::InvalidDefinition {
            task: self.id.clone(),
            reason: reason.into(),
        }
    }
}

/// Builder for [`TaskDefinition`]; `build` validates.
#[derive(Debug)]
pub struct TaskDefinitionBuilder {
    definition: TaskDefinition,
}

impl TaskDefinitionBuilder {
    /// Display title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.definition.title = title.into();
        self
    }

    /// Rounds per attempt.
    #[must_use]
    pub fn rounds(mut self, round_count: usize) -> Self {
        self.definition.round_count = round_count;
        self
    }

    /// Pass rule.
    #[must_use]
    pub fn pass_rule(mut self, rule: PassRule) -> Self {
        self.definition.pass_rule = rule;
        self
    }

    /// Round schedule.
    #[must_use]
    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.definition.difficulty = difficulty;
        self
    }

    /// Phase timings.
    #[must_use]
    pub fn timing(mut self, timing: TaskTiming) -> Self {
        self.definition.timing = timing;
        self
    }

    /// Response completion policy.
    #[must_use]
    pub fn submit(mut self, submit: SubmitPolicy) -> Self {
        self.definition.submit = submit;
        self
    }

    /// Score weighting.
    #[must_use]
    pub fn scoring(mut self, scoring: ScoreBlend) -> Self {
        self.definition.scoring = scoring;
        self
    }

    /// Mark as premium-only.
    #[must_use]
    pub fn premium(mut self, premium: bool) -> Self {
        self.definition.premium = premium;
        self
    }

    /// Validate and finish.
    ///
    /// # Errors
    /// Returns `RecallError::InvalidDefinition` if any invariant fails.
    pub fn build(self) -> Result<TaskDefinition> {
        self.definition.validate()?;
        Ok(self.definition)
    }
}

//! The standard task set.
//!
//! Catalog order is unlock order: passing the task at level `n` unlocks
//! level `n + 1`. Timing and scoring defaults come from [`RecallConfig`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::RecallConfig;
use crate::definition::{Difficulty, Presentation, SubmitPolicy, TaskDefinition, TaskTiming};
use crate::error::{RecallError, Result};
use crate::evaluate::{PairedRecall, PatternMatch, PositionalMatch, SignalDetection, UnorderedRecall};
use crate::scoring::{PassRule, ScoreBlend};
use crate::stimulus::{CategoryWords, ColorSequence, GridPattern, NBackStream, SymbolSequence, WordPairs};
use crate::types::{RoundParams, TaskId};

/// An ordered, named set of task definitions.
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    tasks: Vec<Arc<TaskDefinition>>,
}

impl Catalog {
    /// Build a catalog from definitions in unlock order.
    ///
    /// # Errors
    /// Returns `RecallError::Config` for an empty set or duplicate ids.
    pub fn new(name: impl Into<String>, tasks: Vec<TaskDefinition>) -> Result<Self> {
        let name = name.into();
        if tasks.is_empty() {
            return Err(RecallError::Config(format!("task set '{name}' is empty")));
        }
        for (i, task) in tasks.iter().enumerate() {
            if tasks[..i].iter().any(|t| t.id == task.id) {
                return Err(RecallError::Config(format!(
                    "task set '{name}' lists '{}' twice",
                    task.id
                )));
            }
        }
        Ok(Self {
            name,
            tasks: tasks.into_iter().map(Arc::new).collect(),
        })
    }

    /// The eight standard tasks, tuned by `config`.
    ///
    /// # Errors
    /// Propagates definition validation errors, which only a bad `config`
    /// (for instance a negative speed penalty) can cause.
    pub fn standard(config: &RecallConfig) -> Result<Self> {
        let speed = config.scoring.speed_curve();
        let accuracy = ScoreBlend::accuracy_only().with_speed(speed);
        let base_timing = TaskTiming {
            response_limit: config.timing.response_limit(),
            feedback: config.timing.feedback(),
            ..TaskTiming::default()
        };
        let timed = |secs: u64| TaskTiming {
            presentation: Presentation::Timed(Duration::from_secs(secs)),
            ..base_timing
        };

        let tasks = vec![
            TaskDefinition::builder("digit-span", SymbolSequence::digits(), PositionalMatch)
                .title("Digit Span")
                .rounds(3)
                .pass_rule(PassRule::MinCorrectRounds(2))
                .difficulty(Difficulty::ramp(RoundParams::load(4), 1, 9))
                .timing(timed(4))
                .submit(SubmitPolicy::WhenFilled)
                .scoring(accuracy.clone())
                .build()?,
            TaskDefinition::builder(
                "backward-digit-span",
                SymbolSequence::digits().reversed(),
                PositionalMatch,
            )
            .title("Backward Digit Span")
            .rounds(3)
            .pass_rule(PassRule::MinCorrectRounds(2))
            .difficulty(Difficulty::ramp(RoundParams::load(3), 1, 8))
            .timing(timed(4))
            .submit(SubmitPolicy::WhenFilled)
            .scoring(accuracy.clone())
            .build()?,
            TaskDefinition::builder("letter-span", SymbolSequence::letters(), PositionalMatch)
                .title("Letter Span")
                .rounds(3)
                .pass_rule(PassRule::MinCorrectRounds(2))
                .difficulty(Difficulty::ramp(RoundParams::load(4), 1, 8))
                .timing(timed(4))
                .submit(SubmitPolicy::WhenFilled)
                .scoring(accuracy.clone())
                .build()?,
            TaskDefinition::builder("pattern-grid", GridPattern::counted(), PatternMatch)
                .title("Pattern Grid")
                .rounds(3)
                .pass_rule(PassRule::MinMeanScore(70))
                .difficulty(Difficulty::Table {
                    rows: vec![RoundParams::grid(3, 3), RoundParams::grid(4, 5), RoundParams::grid(4, 6)],
                })
                .timing(timed(3))
                .scoring(accuracy.clone())
                .build()?,
            TaskDefinition::builder("color-sequence", ColorSequence::default(), PositionalMatch)
                .title("Color Sequence")
                .rounds(3)
                .pass_rule(PassRule::MinCorrectRounds(2))
                .difficulty(Difficulty::ramp(RoundParams::load(3), 1, 7))
                .timing(timed(4))
                .submit(SubmitPolicy::WhenFilled)
                .scoring(accuracy.clone())
                .build()?,
            TaskDefinition::builder(
                "category-recall",
                CategoryWords::default(),
                UnorderedRecall { min_ratio: 0.8 },
            )
            .title("Category Recall")
            .rounds(2)
            .pass_rule(PassRule::MinMeanScore(60))
            .difficulty(Difficulty::fixed(RoundParams::load(6)))
            .timing(TaskTiming {
                retention: Duration::from_secs(3),
                ..base_timing
            })
            .scoring(ScoreBlend::balanced(speed))
            .build()?,
            TaskDefinition::builder("word-pairs", WordPairs::default(), PairedRecall)
                .title("Word Pairs")
                .rounds(3)
                .pass_rule(PassRule::MinCorrectRounds(2))
                .difficulty(Difficulty::ramp(RoundParams::load(3), 1, 5))
                .timing(base_timing)
                .scoring(accuracy.clone())
                .premium(true)
                .build()?,
            TaskDefinition::builder("two-back", NBackStream::new(2, 0.3), SignalDetection)
                .title("2-Back")
                .rounds(2)
                .pass_rule(PassRule::MinMeanScore(70))
                .difficulty(Difficulty::fixed(RoundParams::load(12)))
                .timing(base_timing)
                .scoring(accuracy)
                .premium(true)
                .build()?,
        ];

        Self::new(config.progress.task_set.clone(), tasks)
    }

    /// Task set name, used to key stored progress.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Definition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<TaskDefinition>> {
        self.tasks.iter().find(|t| t.id.as_str() == id)
    }

    /// Definition at unlock level `level`.
    #[must_use]
    pub fn at(&self, level: usize) -> Option<&Arc<TaskDefinition>> {
        self.tasks.get(level)
    }

    /// Unlock level of `id`.
    #[must_use]
    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id.as_str() == id)
    }

    /// Ids in unlock order.
    #[must_use]
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id.clone()).collect()
    }

    /// Definitions in unlock order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TaskDefinition>> {
        self.tasks.iter()
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false for a constructed catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

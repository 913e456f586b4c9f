//! Grid pattern generator.

use std::collections::BTreeSet;

use rand::{Rng, RngCore};

use crate::error::{RecallError, Result};
use crate::types::RoundParams;

use super::{Answer, Payload, Stimulus, StimulusGenerator};

/// How many cells light up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridFill {
    /// Exactly `params.load` cells, sampled without replacement.
    Count,
    /// Each cell independently with this probability.
    Probability(f64),
}

/// An `n×n` grid with some cells highlighted.
#[derive(Debug, Clone)]
pub struct GridPattern {
    fill: GridFill,
}

impl GridPattern {
    /// Exactly `load` active cells per round.
    #[must_use]
    pub fn counted() -> Self {
        Self {
            fill: GridFill::Count,
        }
    }

    /// Each cell active with probability `p`.
    #[must_use]
    pub fn probabilistic(p: f64) -> Self {
        Self {
            fill: GridFill::Probability(p),
        }
    }
}

impl StimulusGenerator for GridPattern {
    fn name(&self) -> &'static str {
        "grid_pattern"
    }

    fn validate(&self, params: &RoundParams) -> Result<()> {
        if params.grid_size == 0 {
            return Err(RecallError::params(self.name(), "grid size must be at least 1"));
        }
        let cells = params.grid_size * params.grid_size;
        match self.fill {
            GridFill::Count => {
                if params.load == 0 {
                    return Err(RecallError::params(self.name(), "active cell count must be at least 1"));
                }
                if params.load > cells {
                    return Err(RecallError::params(
                        self.name(),
                        format!("{} active cells do not fit a {cells}-cell grid", params.load),
                    ));
                }
            }
            GridFill::Probability(p) => {
                if !(p > 0.0 && p <= 1.0) {
                    return Err(RecallError::params(
                        self.name(),
                        format!("fill probability {p} outside (0, 1]"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn generate(&self, params: &RoundParams, rng: &mut dyn RngCore) -> Result<Stimulus> {
        self.validate(params)?;
        let cells = params.grid_size * params.grid_size;

        let mut active: BTreeSet<usize> = match self.fill {
            GridFill::Count => rand::seq::index::sample(rng, cells, params.load)
                .into_iter()
                .collect(),
            GridFill::Probability(p) => (0..cells).filter(|_| rng.gen_bool(p)).collect(),
        };

        // A blank grid is not a stimulus.
        if active.is_empty() {
            active.insert(rng.gen_range(0..cells));
        }

        Ok(Stimulus {
            payload: Payload::Grid {
                size: params.grid_size,
                active: active.iter().copied().collect(),
            },
            load: active.len(),
            answer: Answer::Cells(active),
        })
    }
}

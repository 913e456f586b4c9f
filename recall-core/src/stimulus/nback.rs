//! N-back stream generator.
//!
//! Each position from `n` onwards is a target with probability
//! `target_rate`; non-targets are forced to differ from the item `n` steps
//! back, so the answer set is exactly the planted targets.

use std::collections::BTreeSet;

use rand::{Rng, RngCore};

use crate::error::{RecallError, Result};
use crate::types::RoundParams;

use super::{Answer, Payload, Stimulus, StimulusGenerator};

const STREAM_ALPHABET: &[char] = &['B', 'C', 'D', 'F', 'G', 'H', 'K', 'M'];

/// Letter stream for an n-back detection task. `params.load` is the stream length.
#[derive(Debug, Clone)]
pub struct NBackStream {
    n: usize,
    target_rate: f64,
}

impl NBackStream {
    /// An `n`-back stream with the given target probability.
    #[must_use]
    pub fn new(n: usize, target_rate: f64) -> Self {
        Self { n, target_rate }
    }

    fn pick_other(rng: &mut dyn RngCore, avoid: char) -> char {
        let offset = rng.gen_range(1..STREAM_ALPHABET.len());
        let base = STREAM_ALPHABET
            .iter()
            .position(|&c| c == avoid)
            .unwrap_or(0);
        STREAM_ALPHABET[(base + offset) % STREAM_ALPHABET.len()]
    }
}

impl StimulusGenerator for NBackStream {
    fn name(&self) -> &'static str {
        "nback_stream"
    }

    fn validate(&self, params: &RoundParams) -> Result<()> {
        if self.n == 0 {
            return Err(RecallError::params(self.name(), "n must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.target_rate) {
            return Err(RecallError::params(
                self.name(),
                format!("target rate {} outside [0, 1]", self.target_rate),
            ));
        }
        if params.load <= self.n {
            return Err(RecallError::params(
                self.name(),
                format!("stream of {} items has no {}-back positions", params.load, self.n),
            ));
        }
        Ok(())
    }

    fn generate(&self, params: &RoundParams, rng: &mut dyn RngCore) -> Result<Stimulus> {
        self.validate(params)?;

        let mut items: Vec<char> = Vec::with_capacity(params.load);
        let mut targets = BTreeSet::new();

        for i in 0..params.load {
            let item = if i < self.n {
                STREAM_ALPHABET[rng.gen_range(0..STREAM_ALPHABET.len())]
            } else if rng.gen_bool(self.target_rate) {
                targets.insert(i);
                items[i - self.n]
            } else {
                Self::pick_other(rng, items[i - self.n])
            };
            items.push(item);
        }

        Ok(Stimulus {
            payload: Payload::Stream { n: self.n, items },
            answer: Answer::Positions(targets),
            load: params.load,
        })
    }
}

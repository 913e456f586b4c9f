//! Free recall: unordered word lists and cued pairs.

use std::collections::{BTreeSet, HashSet};

use crate::stimulus::Answer;

use super::{Evaluator, Judgement, Response, normalize};

/// Set-based recall. Order is irrelevant; comparison is trimmed and
/// case-insensitive; repeating a word earns it once; intrusions (words
/// that were never shown) cost nothing.
#[derive(Debug, Clone, Copy)]
pub struct UnorderedRecall {
    /// Share of words that must be recalled for the round to be correct.
    pub min_ratio: f64,
}

impl Default for UnorderedRecall {
    fn default() -> Self {
        Self { min_ratio: 1.0 }
    }
}

impl Evaluator for UnorderedRecall {
    fn name(&self) -> &'static str {
        "unordered_recall"
    }

    fn judge(&self, response: &Response, expected: &Answer) -> Judgement {
        let expected: BTreeSet<String> = match expected {
            Answer::Words(words) | Answer::Ordered(words) => {
                words.iter().map(|w| normalize(w)).collect()
            }
            other => return Judgement::incorrect(other.len()),
        };

        let given: HashSet<String> = response.words().into_iter().collect();
        let hits = expected.iter().filter(|w| given.contains(*w)).count();
        let accuracy = Judgement::ratio(hits, expected.len());

        Judgement {
            correct: accuracy + f64::EPSILON >= self.min_ratio,
            correct_items: hits,
            total_items: expected.len(),
            accuracy,
        }
    }
}

/// Cued recall: the response lists each pair's target in cue order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairedRecall;

impl Evaluator for PairedRecall {
    fn name(&self) -> &'static str {
        "paired_recall"
    }

    fn judge(&self, response: &Response, expected: &Answer) -> Judgement {
        let Answer::Pairs(pairs) = expected else {
            return Judgement::incorrect(expected.len());
        };

        // One entry per cue; skipped cues keep their slot.
        let given = response.slots();

        let hits = pairs
            .iter()
            .zip(&given)
            .filter(|((_, target), answer)| normalize(target) == **answer)
            .count();

        Judgement {
            correct: hits == pairs.len(),
            correct_items: hits,
            total_items: pairs.len(),
            accuracy: Judgement::ratio(hits, pairs.len()),
        }
    }
}

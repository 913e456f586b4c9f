//! Grid pattern evaluation.

use crate::stimulus::Answer;

use super::{Evaluator, Judgement, Response};

/// Compares selected cells with the active set. Each wrongly selected
/// cell cancels one hit, so tapping every cell earns nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatch;

impl Evaluator for PatternMatch {
    fn name(&self) -> &'static str {
        "pattern_match"
    }

    fn judge(&self, response: &Response, expected: &Answer) -> Judgement {
        let Answer::Cells(active) = expected else {
            return Judgement::incorrect(expected.len());
        };

        let selected = response.indices();
        let hits = selected.intersection(active).count();
        let false_alarms = selected.len() - hits;

        Judgement {
            correct: hits == active.len() && false_alarms == 0,
            correct_items: hits,
            total_items: active.len(),
            accuracy: Judgement::ratio(hits.saturating_sub(false_alarms), active.len()),
        }
    }
}

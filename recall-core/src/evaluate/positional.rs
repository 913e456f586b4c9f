//! Exact-match, position-by-position evaluation.

use crate::stimulus::Answer;

use super::{Evaluator, Judgement, Response, normalize};

/// Every position must match for the round to be correct; partial credit
/// is the share of positions that do.
///
/// Symbol answers ignore whitespace and ASCII case ("4 8 2" matches "482",
/// "bk" matches "BK"). Ordered word answers compare trimmed, lowercased
/// entries. A response longer than the answer can score high accuracy but
/// is never marked correct.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalMatch;

impl PositionalMatch {
    fn compare<T: PartialEq>(given: &[T], expected: &[T]) -> Judgement {
        let total = expected.len();
        let hits = given
            .iter()
            .zip(expected)
            .filter(|(g, e)| g == e)
            .count();
        Judgement {
            correct: hits == total && given.len() == total,
            correct_items: hits,
            total_items: total,
            accuracy: Judgement::ratio(hits, total),
        }
    }
}

impl Evaluator for PositionalMatch {
    fn name(&self) -> &'static str {
        "positional_match"
    }

    fn judge(&self, response: &Response, expected: &Answer) -> Judgement {
        match expected {
            Answer::Text(text) => {
                let expected: Vec<char> = Response::Text(text.clone()).symbols();
                Self::compare(&response.symbols(), &expected)
            }
            Answer::Ordered(items) => {
                let expected: Vec<String> = items.iter().map(|i| normalize(i)).collect();
                Self::compare(&response.words(), &expected)
            }
            other => Judgement::incorrect(other.len()),
        }
    }
}

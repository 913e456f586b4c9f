//! N-back signal detection.

use crate::stimulus::Answer;

use super::{Evaluator, Judgement, Response};

/// Hits minus false alarms over targets. A stream without targets is
/// scored on restraint alone: no responses means full marks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalDetection;

impl Evaluator for SignalDetection {
    fn name(&self) -> &'static str {
        "signal_detection"
    }

    fn judge(&self, response: &Response, expected: &Answer) -> Judgement {
        let Answer::Positions(targets) = expected else {
            return Judgement::incorrect(expected.len());
        };

        let flagged = response.indices();
        let hits = flagged.intersection(targets).count();
        let false_alarms = flagged.len() - hits;

        let accuracy = if targets.is_empty() {
            if false_alarms == 0 { 1.0 } else { 0.0 }
        } else {
            Judgement::ratio(hits.saturating_sub(false_alarms), targets.len())
        };

        Judgement {
            correct: hits == targets.len() && false_alarms == 0,
            correct_items: hits,
            total_items: targets.len(),
            accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(list: &[usize]) -> Answer {
        Answer::Positions(list.iter().copied().collect())
    }

    #[test]
    fn all_hits_no_false_alarms() {
        let j = SignalDetection.judge(&Response::Indices(vec![4, 9]), &positions(&[4, 9]));
        assert!(j.correct);
    }

    #[test]
    fn misses_and_false_alarms() {
        let j = SignalDetection.judge(&Response::Indices(vec![4, 5]), &positions(&[4, 9, 12]));
        assert!(!j.correct);
        assert_eq!(j.correct_items, 1);
        assert!(j.accuracy.abs() < f64::EPSILON);
    }

    #[test]
    fn no_targets_rewards_restraint() {
        let quiet = SignalDetection.judge(&Response::empty(), &positions(&[]));
        assert!(quiet.correct);
        assert!((quiet.accuracy - 1.0).abs() < f64::EPSILON);

        let jumpy = SignalDetection.judge(&Response::Indices(vec![3]), &positions(&[]));
        assert!(!jumpy.correct);
        assert!(jumpy.accuracy.abs() < f64::EPSILON);
    }
}

//! Round scoring and attempt aggregation.
//!
//! A round score blends up to three components, each on a 0–100 scale:
//!
//!   accuracy = judgement accuracy × 100
//!   speed    = 100 within the grace period, then −penalty per second, floored at 0
//!   capacity = correct items / capacity target × 100, capped at 100
//!
//!   score = round(Σ wᵢ·componentᵢ / Σ wᵢ)
//!
//! The weights are per task. Most tasks score on accuracy alone; the
//! blend exists because some tasks fold response speed or span size into
//! the headline number.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecallError, Result};
use crate::evaluate::Judgement;
use crate::types::TaskId;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// When the input window opened and when the response was closed, both
/// measured on the engine's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseTiming {
    /// Input window opened.
    pub start: Duration,
    /// Response completed (or timed out).
    pub end: Duration,
}

impl ResponseTiming {
    /// Timing with zero elapsed time, for speed-neutral evaluation.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            start: Duration::ZERO,
            end: Duration::ZERO,
        }
    }

    /// Time taken to respond. A clock running backwards counts as zero.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Linear speed penalty after a grace period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedCurve {
    /// Full credit up to this long.
    pub grace: Duration,
    /// Points lost per second past the grace period.
    pub penalty_per_sec: f64,
}

impl Default for SpeedCurve {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            penalty_per_sec: 2.5,
        }
    }
}

impl SpeedCurve {
    /// Speed component in `[0, 100]` for a response that took `elapsed`.
    #[must_use]
    pub fn score(&self, elapsed: Duration) -> f64 {
        let over = elapsed.saturating_sub(self.grace).as_secs_f64();
        (100.0 - over * self.penalty_per_sec).clamp(0.0, 100.0)
    }
}

// ---------------------------------------------------------------------------
// Blend
// ---------------------------------------------------------------------------

/// Per-task weighting of accuracy, speed and capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBlend {
    /// Weight of the accuracy component.
    pub accuracy_weight: f64,
    /// Weight of the speed component.
    pub speed_weight: f64,
    /// Weight of the capacity component.
    pub capacity_weight: f64,
    /// Speed penalty curve.
    pub speed: SpeedCurve,
    /// Items that earn full capacity credit. `None` uses the answer's size.
    pub capacity_target: Option<usize>,
}

impl Default for ScoreBlend {
    fn default() -> Self {
        Self::accuracy_only()
    }
}

impl ScoreBlend {
    /// Score is accuracy alone.
    #[must_use]
    pub fn accuracy_only() -> Self {
        Self {
            accuracy_weight: 1.0,
            speed_weight: 0.0,
            capacity_weight: 0.0,
            speed: SpeedCurve::default(),
            capacity_target: None,
        }
    }

    /// Equal thirds of accuracy, speed and capacity.
    #[must_use]
    pub fn balanced(speed: SpeedCurve) -> Self {
        Self {
            accuracy_weight: 1.0,
            speed_weight: 1.0,
            capacity_weight: 1.0,
            speed,
            capacity_target: None,
        }
    }

    /// Replace the speed curve.
    #[must_use]
    pub fn with_speed(mut self, speed: SpeedCurve) -> Self {
        self.speed = speed;
        self
    }

    /// Check the weights.
    ///
    /// # Errors
    /// Returns `RecallError::Config` for negative, non-finite or all-zero weights.
    pub fn validate(&self) -> Result<()> {
        let weights = [self.accuracy_weight, self.speed_weight, self.capacity_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecallError::Config(format!(
                "score weights must be finite and non-negative, got {weights:?}"
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(RecallError::Config("score weights sum to zero".to_string()));
        }
        if self.capacity_target == Some(0) {
            return Err(RecallError::Config("capacity target must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Turn a judgement into a round result.
    #[must_use]
    pub fn score(&self, round_index: usize, judgement: &Judgement, timing: ResponseTiming) -> RoundResult {
        let accuracy = (judgement.accuracy * 100.0).clamp(0.0, 100.0);
        let elapsed = timing.elapsed();
        let speed = self.speed.score(elapsed);

        let target = self.capacity_target.unwrap_or(judgement.total_items);
        let capacity = if target == 0 {
            accuracy
        } else {
            (judgement.correct_items as f64 / target as f64 * 100.0).min(100.0)
        };

        let total_weight = self.accuracy_weight + self.speed_weight + self.capacity_weight;
        let blended = if total_weight > 0.0 {
            (accuracy * self.accuracy_weight
                + speed * self.speed_weight
                + capacity * self.capacity_weight)
                / total_weight
        } else {
            accuracy
        };

        RoundResult {
            round_index,
            correct: judgement.correct,
            score: to_score(blended),
            metrics: Metrics {
                accuracy: to_score(accuracy),
                speed: to_score(speed),
                capacity: to_score(capacity),
            },
            correct_items: judgement.correct_items,
            total_items: judgement.total_items,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            timed_out: false,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_score(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Per-component breakdown of a round score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Accuracy component, 0–100.
    pub accuracy: u32,
    /// Speed component, 0–100.
    pub speed: u32,
    /// Capacity component, 0–100.
    pub capacity: u32,
}

/// Outcome of one round. Never mutated after the engine records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Zero-based round index.
    pub round_index: usize,
    /// Whether the round counts as correct.
    pub correct: bool,
    /// Blended score, 0–100.
    pub score: u32,
    /// Component breakdown.
    pub metrics: Metrics,
    /// Items recalled correctly.
    pub correct_items: usize,
    /// Items expected.
    pub total_items: usize,
    /// Time from input opening to completion.
    pub elapsed_ms: u64,
    /// Closed by the response limit rather than by the user.
    pub timed_out: bool,
}

/// How an attempt is judged once every round is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "threshold", rename_all = "snake_case")]
pub enum PassRule {
    /// At least this many rounds marked correct.
    MinCorrectRounds(usize),
    /// Mean round score at least this high.
    MinMeanScore(u32),
}

impl PassRule {
    /// Whether `results` satisfy the rule.
    #[must_use]
    pub fn passes(&self, results: &[RoundResult]) -> bool {
        match *self {
            Self::MinCorrectRounds(n) => results.iter().filter(|r| r.correct).count() >= n,
            Self::MinMeanScore(min) => mean_score(results) >= min,
        }
    }
}

/// Rounded mean of round scores; zero for no rounds.
#[must_use]
pub fn mean_score(results: &[RoundResult]) -> u32 {
    if results.is_empty() {
        return 0;
    }
    let total: u64 = results.iter().map(|r| u64::from(r.score)).sum();
    to_score(total as f64 / results.len() as f64)
}

/// Final result of one task attempt, as emitted to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Task that was attempted.
    pub task_id: TaskId,
    /// Whether the pass rule was met.
    pub passed: bool,
    /// Mean round score, 0–100.
    pub final_score: u32,
    /// Rounds marked correct.
    pub correct_rounds: usize,
    /// Every round, in order.
    pub round_results: Vec<RoundResult>,
}

impl TaskOutcome {
    /// Aggregate a finished attempt.
    #[must_use]
    pub fn aggregate(task_id: TaskId, rule: PassRule, round_results: Vec<RoundResult>) -> Self {
        Self {
            task_id,
            passed: rule.passes(&round_results),
            final_score: mean_score(&round_results),
            correct_rounds: round_results.iter().filter(|r| r.correct).count(),
            round_results,
        }
    }

    /// The record shape accepted by the external results API.
    #[must_use]
    pub fn to_record(&self, visitor_id: impl Into<String>) -> ResultRecord {
        ResultRecord {
            visitor_id: visitor_id.into(),
            task_id: self.task_id.clone(),
            score: self.final_score,
        }
    }
}

/// `{ visitorId, taskId, score }` as accepted by the results API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// Visitor or user the score belongs to.
    pub visitor_id: String,
    /// Task that was attempted.
    pub task_id: TaskId,
    /// Final score, 0–100.
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judgement(correct_items: usize, total_items: usize) -> Judgement {
        Judgement {
            correct: correct_items == total_items,
            correct_items,
            total_items,
            accuracy: Judgement::ratio(correct_items, total_items),
        }
    }

    fn after(secs: u64) -> ResponseTiming {
        ResponseTiming {
            start: Duration::from_secs(5),
            end: Duration::from_secs(5 + secs),
        }
    }

    #[test]
    fn speed_full_credit_within_grace() {
        let curve = SpeedCurve::default();
        assert!((curve.score(Duration::from_secs(10)) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn speed_decays_linearly_then_floors() {
        let curve = SpeedCurve::default();
        assert!((curve.score(Duration::from_secs(14)) - 90.0).abs() < 1e-9);
        assert!((curve.score(Duration::from_secs(50)) - 0.0).abs() < f64::EPSILON);
        assert!((curve.score(Duration::from_secs(500)) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn accuracy_only_ignores_time() {
        let result = ScoreBlend::accuracy_only().score(0, &judgement(2, 3), after(120));
        assert_eq!(result.score, 67);
        assert_eq!(result.metrics.speed, 0);
    }

    #[test]
    fn balanced_blend_averages_components() {
        let blend = ScoreBlend::balanced(SpeedCurve::default());
        // accuracy 50, speed 90, capacity 50
        let result = blend.score(1, &judgement(2, 4), after(14));
        assert_eq!(result.metrics.accuracy, 50);
        assert_eq!(result.metrics.speed, 90);
        assert_eq!(result.metrics.capacity, 50);
        assert_eq!(result.score, 63);
        assert_eq!(result.round_index, 1);
        assert_eq!(result.elapsed_ms, 14_000);
    }

    #[test]
    fn capacity_target_caps_at_full_credit() {
        let blend = ScoreBlend {
            accuracy_weight: 0.0,
            capacity_weight: 1.0,
            capacity_target: Some(4),
            ..ScoreBlend::accuracy_only()
        };
        assert_eq!(blend.score(0, &judgement(6, 6), ResponseTiming::instant()).score, 100);
        assert_eq!(blend.score(0, &judgement(3, 6), ResponseTiming::instant()).score, 75);
    }

    #[test]
    fn zero_weights_rejected() {
        let blend = ScoreBlend {
            accuracy_weight: 0.0,
            ..ScoreBlend::accuracy_only()
        };
        assert!(blend.validate().is_err());
    }

    #[test]
    fn backwards_clock_counts_as_instant() {
        let timing = ResponseTiming {
            start: Duration::from_secs(9),
            end: Duration::from_secs(3),
        };
        assert_eq!(timing.elapsed(), Duration::ZERO);
    }

    #[test]
    fn pass_rules() {
        let blend = ScoreBlend::accuracy_only();
        let results = vec![
            blend.score(0, &judgement(5, 5), ResponseTiming::instant()),
            blend.score(1, &judgement(4, 5), ResponseTiming::instant()),
            blend.score(2, &judgement(5, 5), ResponseTiming::instant()),
        ];
        assert!(PassRule::MinCorrectRounds(2).passes(&results));
        assert!(!PassRule::MinCorrectRounds(3).passes(&results));
        assert_eq!(mean_score(&results), 93);
        assert!(PassRule::MinMeanScore(90).passes(&results));
        assert!(!PassRule::MinMeanScore(95).passes(&results));
    }

    #[test]
    fn outcome_record_shape() {
        let outcome = TaskOutcome::aggregate(
            TaskId::new("digit-span"),
            PassRule::MinCorrectRounds(1),
            vec![ScoreBlend::accuracy_only().score(0, &judgement(3, 4), ResponseTiming::instant())],
        );
        let json = serde_json::to_value(outcome.to_record("visitor-1")).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "visitorId": "visitor-1", "taskId": "digit-span", "score": 75 })
        );
    }
}

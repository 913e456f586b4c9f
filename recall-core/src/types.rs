//! Core type definitions shared across the engine.
//!
//! All value types are serializable so hosts can ship them across whatever
//! boundary they render on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Stable identifier for a task type (e.g. `"digit-span"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a task id from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Generation counter identifying one round of one attempt.
///
/// Every new round (and every reset) bumps the counter. Responses carry the
/// token they were produced for, so a response aimed at a round that has
/// already been closed by a timeout is recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundToken(pub u64);

impl fmt::Display for RoundToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r#{}", self.0)
    }
}

/// Identifier of one armed timer. Never reused within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Phase of a task attempt.
///
/// ```text
/// idle → presenting → memorizing → awaitingInput → evaluating
///                ▲                                     │
///                └──────── roundComplete ◄─────────────┤
///                                                      ▼
///                                               taskComplete
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing generated yet; waiting for `start`.
    Idle,
    /// Stimulus is visible.
    Presenting,
    /// Stimulus hidden; retention interval before recall.
    Memorizing,
    /// Collecting the response.
    AwaitingInput,
    /// Scoring the response (transient).
    Evaluating,
    /// Round scored; feedback shown before the next round.
    RoundComplete,
    /// All rounds scored. Terminal for this attempt.
    TaskComplete,
}

impl Phase {
    /// Whether the engine is mid-attempt (not idle and not finished).
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::TaskComplete)
    }
}

// ---------------------------------------------------------------------------
// Generation parameters
// ---------------------------------------------------------------------------

/// Parameters handed to a stimulus generator for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundParams {
    /// Item count: sequence length, active cells, words, pairs or stream length.
    pub load: usize,
    /// Grid side length for grid tasks; ignored elsewhere.
    #[serde(default)]
    pub grid_size: usize,
    /// Overrides the definition's timed presentation for this round.
    #[serde(default)]
    pub display: Option<Duration>,
}

impl RoundParams {
    /// Parameters with just a load.
    #[must_use]
    pub const fn load(load: usize) -> Self {
        Self {
            load,
            grid_size: 0,
            display: None,
        }
    }

    /// Parameters for an `n×n` grid with `load` active cells.
    #[must_use]
    pub const fn grid(grid_size: usize, load: usize) -> Self {
        Self {
            load,
            grid_size,
            display: None,
        }
    }

    /// Set the per-round display duration.
    #[must_use]
    pub const fn with_display(mut self, display: Duration) -> Self {
        self.display = Some(display);
        self
    }
}

//! Stimulus generation.
//!
//! A generator is a pure function of [`RoundParams`] and an injected PRNG.
//! Generators hold no mutable state, so a host may pre-generate the next
//! round on another thread while the current one is being scored.
//!
//! Generators shipped with the crate:
//!
//! - [`SymbolSequence`]: digit / letter spans, optionally recalled backwards
//! - [`GridPattern`]: `n×n` grids with active cells
//! - [`CategoryWords`]: words sampled from a category vocabulary
//! - [`ColorSequence`]: ordered color runs
//! - [`WordPairs`]: cue → target associations
//! - [`NBackStream`]: letter streams with n-back targets

pub mod grid;
pub mod nback;
pub mod sequence;
pub mod words;

pub use grid::{GridFill, GridPattern};
pub use nback::NBackStream;
pub use sequence::{ColorSequence, SymbolSequence};
pub use words::{CategoryWords, WordPairs};

use std::collections::BTreeSet;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::evaluate::Response;
use crate::types::RoundParams;

/// Produces fresh stimuli for a task type.
pub trait StimulusGenerator: Send + Sync + fmt::Debug {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Check that `params` can produce a non-empty stimulus.
    ///
    /// # Errors
    /// Returns `RecallError::InvalidParams` describing the problem.
    fn validate(&self, params: &RoundParams) -> Result<()>;

    /// Generate a stimulus and its expected answer.
    ///
    /// # Errors
    /// Returns `RecallError::InvalidParams` when `params` fail [`validate`](Self::validate).
    fn generate(&self, params: &RoundParams, rng: &mut dyn RngCore) -> Result<Stimulus>;
}

/// The content shown for one round, plus what a perfect recall looks like.
///
/// Immutable once generated; lives for exactly one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    /// What gets rendered.
    pub payload: Payload,
    /// What the evaluator compares against.
    pub answer: Answer,
    /// Item count the stimulus was generated for.
    pub load: usize,
}

impl Stimulus {
    /// Number of items a complete response is expected to contain.
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.answer.len()
    }
}

/// Renderable stimulus content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// Digits or letters shown in order.
    Symbols {
        /// The symbols.
        symbols: Vec<char>,
    },
    /// Square grid with highlighted cells (row-major indices).
    Grid {
        /// Side length.
        size: usize,
        /// Highlighted cell indices, ascending.
        active: Vec<usize>,
    },
    /// Words drawn from one category.
    Words {
        /// Category name.
        category: String,
        /// The words, in display order.
        words: Vec<String>,
    },
    /// Colors shown in order.
    Colors {
        /// Color names.
        colors: Vec<String>,
    },
    /// Cue/target word pairs.
    Pairs {
        /// `(cue, target)` pairs in display order.
        pairs: Vec<(String, String)>,
    },
    /// Letters shown one at a time for n-back matching.
    Stream {
        /// Look-back distance.
        n: usize,
        /// The stream.
        items: Vec<char>,
    },
}

/// The expected answer for a stimulus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// Exact symbol string (digit / letter spans).
    Text(String),
    /// Ordered items compared by position (colors).
    Ordered(Vec<String>),
    /// Items recalled in any order (category words).
    Words(Vec<String>),
    /// Set of active grid cells.
    Cells(BTreeSet<usize>),
    /// Cue/target pairs; the response lists targets in cue order.
    Pairs(Vec<(String, String)>),
    /// Stream positions that match the item n steps back.
    Positions(BTreeSet<usize>),
}

impl Answer {
    /// Number of items in a complete answer.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().filter(|c| !c.is_whitespace()).count(),
            Self::Ordered(items) | Self::Words(items) => items.len(),
            Self::Cells(cells) | Self::Positions(cells) => cells.len(),
            Self::Pairs(pairs) => pairs.len(),
        }
    }

    /// Whether the answer has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many of this answer's items `response` supplies, counted in the
    /// answer's own unit: symbols for text, entries for lists and pairs,
    /// distinct positions for cells.
    #[must_use]
    pub fn filled_by(&self, response: &Response) -> usize {
        match self {
            Self::Text(_) => response.symbols().len(),
            Self::Ordered(_) | Self::Words(_) | Self::Pairs(_) => response.words().len(),
            Self::Cells(_) | Self::Positions(_) => response.indices().len(),
        }
    }

    /// The response a perfect recall would submit.
    #[must_use]
    pub fn as_response(&self) -> Response {
        match self {
            Self::Text(text) => Response::Text(text.clone()),
            Self::Ordered(items) | Self::Words(items) => Response::Items(items.clone()),
            Self::Cells(cells) | Self::Positions(cells) => {
                Response::Indices(cells.iter().copied().collect())
            }
            Self::Pairs(pairs) => {
                Response::Items(pairs.iter().map(|(_, target)| target.clone()).collect())
            }
        }
    }
}

//! Response evaluation.
//!
//! An [`Evaluator`] compares a [`Response`] with an [`Answer`] and produces
//! a [`Judgement`]; the task's [`ScoreBlend`] then turns that into a
//! [`RoundResult`]. Evaluators are total: any response, however malformed
//! or mismatched, yields a judgement (usually a poor one) and never an
//! error. They never read a clock; timing arrives as [`ResponseTiming`].

pub mod detection;
pub mod pattern;
pub mod positional;
pub mod recall;

pub use detection::SignalDetection;
pub use pattern::PatternMatch;
pub use positional::PositionalMatch;
pub use recall::{PairedRecall, UnorderedRecall};

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scoring::{ResponseTiming, RoundResult, ScoreBlend};
use crate::stimulus::Answer;

/// What the user entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Response {
    /// Free text (typed digits, comma-separated words).
    Text(String),
    /// Discrete entries (one input box per item).
    Items(Vec<String>),
    /// Selected positions (grid cells, n-back hits).
    Indices(Vec<usize>),
}

impl Response {
    /// A response with nothing in it.
    #[must_use]
    pub fn empty() -> Self {
        Self::Items(Vec::new())
    }

    /// Number of entries given, used to detect a filled input.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().filter(|c| !c.is_whitespace()).count(),
            Self::Items(items) => items.iter().filter(|i| !i.trim().is_empty()).count(),
            Self::Indices(indices) => indices.iter().collect::<BTreeSet<_>>().len(),
        }
    }

    /// Whether nothing was entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries as normalised words: trimmed, lowercased, blanks dropped.
    ///
    /// Free text is split on commas, semicolons and line breaks, or on
    /// whitespace when none of those appear.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        match self {
            Self::Text(text) => {
                let parts: Vec<&str> = if text.contains(SEPARATORS) {
                    text.split(SEPARATORS).collect()
                } else {
                    text.split_whitespace().collect()
                };
                parts.into_iter().map(normalize).filter(|w| !w.is_empty()).collect()
            }
            Self::Items(items) => items.iter().map(|i| normalize(i)).filter(|w| !w.is_empty()).collect(),
            Self::Indices(indices) => indices.iter().map(ToString::to_string).collect(),
        }
    }

    /// Entries as normalised slots, one per position the user filled or
    /// skipped. Blank items and empty separated fields keep their place;
    /// separator-free text falls back to [`words`](Self::words).
    #[must_use]
    pub fn slots(&self) -> Vec<String> {
        match self {
            Self::Items(items) => items.iter().map(|i| normalize(i)).collect(),
            Self::Text(text) if text.contains(SEPARATORS) => text.split(SEPARATORS).map(normalize).collect(),
            other => other.words(),
        }
    }

    /// Entries as uppercase symbols with whitespace removed.
    #[must_use]
    pub fn symbols(&self) -> Vec<char> {
        match self {
            Self::Text(text) => upper_symbols(text),
            Self::Items(items) => items.iter().flat_map(|i| upper_symbols(i)).collect(),
            Self::Indices(indices) => indices
                .iter()
                .flat_map(|i| i.to_string().chars().collect::<Vec<_>>())
                .collect(),
        }
    }

    /// Entries as distinct positions. Unparseable entries are dropped.
    #[must_use]
    pub fn indices(&self) -> BTreeSet<usize> {
        match self {
            Self::Indices(indices) => indices.iter().copied().collect(),
            Self::Items(items) => items.iter().filter_map(|i| i.trim().parse().ok()).collect(),
            Self::Text(text) => text
                .split(|c: char| !c.is_ascii_digit())
                .filter_map(|s| s.parse().ok())
                .collect(),
        }
    }
}

const SEPARATORS: [char; 3] = [',', ';', '\n'];

/// Trim and lowercase, the comparison form for word answers.
#[must_use]
pub fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

fn upper_symbols(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Correctness of one response, before time and capacity are blended in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Judgement {
    /// Whether the round counts as correct.
    pub correct: bool,
    /// Items recalled correctly (hits, matching positions).
    pub correct_items: usize,
    /// Items in the expected answer.
    pub total_items: usize,
    /// Accuracy in `[0, 1]`.
    pub accuracy: f64,
}

impl Judgement {
    /// The judgement for a response that cannot be compared at all.
    #[must_use]
    pub fn incorrect(total_items: usize) -> Self {
        Self {
            correct: false,
            correct_items: 0,
            total_items,
            accuracy: 0.0,
        }
    }

    /// `hits / total`, with an empty answer counting as fully recalled.
    #[must_use]
    pub fn ratio(hits: usize, total: usize) -> f64 {
        if total == 0 {
            1.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Compares responses with expected answers for one task type.
pub trait Evaluator: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Judge a response. Must be deterministic and total.
    fn judge(&self, response: &Response, expected: &Answer) -> Judgement;

    /// Judge a response and score it with `blend`.
    fn evaluate(
        &self,
        round_index: usize,
        response: &Response,
        expected: &Answer,
        timing: ResponseTiming,
        blend: &ScoreBlend,
    ) -> RoundResult {
        let judgement = self.judge(response, expected);
        blend.score(round_index, &judgement, timing)
    }
}

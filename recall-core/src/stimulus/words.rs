//! Word-based generators: category lists and paired associates.
//!
//! Both sample without replacement, so a round never shows the same word
//! twice.

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::error::{RecallError, Result};
use crate::types::RoundParams;

use super::{Answer, Payload, Stimulus, StimulusGenerator};

/// A named list of words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display name.
    pub name: &'static str,
    /// Distinct words in the category.
    pub words: &'static [&'static str],
}

/// The built-in vocabulary table.
pub const VOCABULARY: &[Category] = &[
    Category {
        name: "Fruits",
        words: &[
            "Apple", "Banana", "Orange", "Grape", "Mango", "Peach", "Cherry", "Lemon", "Plum",
            "Pear", "Kiwi", "Melon",
        ],
    },
    Category {
        name: "Animals",
        words: &[
            "Tiger", "Horse", "Rabbit", "Eagle", "Whale", "Zebra", "Monkey", "Camel", "Otter",
            "Wolf", "Parrot", "Turtle",
        ],
    },
    Category {
        name: "Countries",
        words: &[
            "France", "Brazil", "Japan", "Kenya", "Canada", "Norway", "Peru", "Egypt", "India",
            "Chile", "Spain", "Greece",
        ],
    },
    Category {
        name: "Tools",
        words: &[
            "Hammer", "Wrench", "Saw", "Drill", "Chisel", "Pliers", "Shovel", "Rake", "Ladder",
            "Axe", "Level", "Clamp",
        ],
    },
    Category {
        name: "Instruments",
        words: &[
            "Piano", "Violin", "Guitar", "Flute", "Drum", "Trumpet", "Harp", "Cello", "Oboe",
            "Banjo", "Organ", "Tuba",
        ],
    },
];

/// Words sampled from one category per round, recalled in any order.
#[derive(Debug, Clone)]
pub struct CategoryWords {
    categories: Vec<Category>,
}

impl CategoryWords {
    /// A generator over the given categories.
    #[must_use]
    pub fn new(categories: &[Category]) -> Self {
        Self {
            categories: categories.to_vec(),
        }
    }

    fn eligible(&self, load: usize) -> Vec<&Category> {
        self.categories.iter().filter(|c| c.words.len() >= load).collect()
    }
}

impl Default for CategoryWords {
    fn default() -> Self {
        Self::new(VOCABULARY)
    }
}

impl StimulusGenerator for CategoryWords {
    fn name(&self) -> &'static str {
        "category_words"
    }

    fn validate(&self, params: &RoundParams) -> Result<()> {
        if params.load == 0 {
            return Err(RecallError::params(self.name(), "word count must be at least 1"));
        }
        if self.eligible(params.load).is_empty() {
            return Err(RecallError::params(
                self.name(),
                format!("no category holds {} distinct words", params.load),
            ));
        }
        Ok(())
    }

    fn generate(&self, params: &RoundParams, rng: &mut dyn RngCore) -> Result<Stimulus> {
        self.validate(params)?;

        let eligible = self.eligible(params.load);
        let category = eligible
            .choose(rng)
            .ok_or_else(|| RecallError::params(self.name(), "no eligible category"))?;

        let words: Vec<String> = category
            .words
            .choose_multiple(rng, params.load)
            .map(|w| (*w).to_string())
            .collect();

        Ok(Stimulus {
            answer: Answer::Words(words.clone()),
            payload: Payload::Words {
                category: category.name.to_string(),
                words,
            },
            load: params.load,
        })
    }
}

/// Cue/target pairs drawn from the whole vocabulary.
#[derive(Debug, Clone)]
pub struct WordPairs {
    pool: Vec<&'static str>,
}

impl WordPairs {
    /// A generator drawing from the given categories.
    #[must_use]
    pub fn new(categories: &[Category]) -> Self {
        let mut pool: Vec<&'static str> =
            categories.iter().flat_map(|c| c.words.iter().copied()).collect();
        pool.sort_unstable();
        pool.dedup();
        Self { pool }
    }
}

impl Default for WordPairs {
    fn default() -> Self {
        Self::new(VOCABULARY)
    }
}

impl StimulusGenerator for WordPairs {
    fn name(&self) -> &'static str {
        "word_pairs"
    }

    fn validate(&self, params: &RoundParams) -> Result<()> {
        if params.load == 0 {
            return Err(RecallError::params(self.name(), "pair count must be at least 1"));
        }
        if params.load * 2 > self.pool.len() {
            return Err(RecallError::params(
                self.name(),
                format!("{} pairs need {} distinct words, pool has {}", params.load, params.load * 2, self.pool.len()),
            ));
        }
        Ok(())
    }

    fn generate(&self, params: &RoundParams, rng: &mut dyn RngCore) -> Result<Stimulus> {
        self.validate(params)?;

        let drawn: Vec<&str> = self.pool.choose_multiple(rng, params.load * 2).copied().collect();
        let pairs: Vec<(String, String)> = drawn
            .chunks_exact(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();

        Ok(Stimulus {
            answer: Answer::Pairs(pairs.clone()),
            payload: Payload::Pairs { pairs },
            load: params.load,
        })
    }
}

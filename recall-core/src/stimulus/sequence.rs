//! Sequence generators: digit/letter spans and color runs.
//!
//! Symbols are drawn uniformly and independently, so adjacent repeats
//! ("4 4 7") can and do occur.

use rand::{Rng, RngCore};

use crate::error::{RecallError, Result};
use crate::types::RoundParams;

use super::{Answer, Payload, Stimulus, StimulusGenerator};

/// Decimal digits.
pub const DIGITS: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Consonants only, so spans never spell words.
pub const CONSONANTS: &[char] = &[
    'B', 'C', 'D', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'X', 'Z',
];

/// The default color palette.
pub const PALETTE: &[&str] = &["red", "green", "blue", "yellow", "purple", "orange"];

/// Uniformly random symbols from a fixed alphabet.
#[derive(Debug, Clone)]
pub struct SymbolSequence {
    alphabet: Vec<char>,
    reversed: bool,
}

impl SymbolSequence {
    /// A generator over an arbitrary alphabet.
    #[must_use]
    pub fn new(alphabet: &[char]) -> Self {
        Self {
            alphabet: alphabet.to_vec(),
            reversed: false,
        }
    }

    /// Digit span.
    #[must_use]
    pub fn digits() -> Self {
        Self::new(DIGITS)
    }

    /// Letter span over consonants.
    #[must_use]
    pub fn letters() -> Self {
        Self::new(CONSONANTS)
    }

    /// Expect the sequence to be recalled back to front.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }
}

impl StimulusGenerator for SymbolSequence {
    fn name(&self) -> &'static str {
        if self.reversed {
            "symbol_sequence_reversed"
        } else {
            "symbol_sequence"
        }
    }

    fn validate(&self, params: &RoundParams) -> Result<()> {
        if self.alphabet.is_empty() {
            return Err(RecallError::params(self.name(), "alphabet is empty"));
        }
        if params.load == 0 {
            return Err(RecallError::params(self.name(), "sequence length must be at least 1"));
        }
        Ok(())
    }

    fn generate(&self, params: &RoundParams, rng: &mut dyn RngCore) -> Result<Stimulus> {
        self.validate(params)?;

        let symbols: Vec<char> = (0..params.load)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
            .collect();

        let answer: String = if self.reversed {
            symbols.iter().rev().collect()
        } else {
            symbols.iter().collect()
        };

        Ok(Stimulus {
            payload: Payload::Symbols { symbols },
            answer: Answer::Text(answer),
            load: params.load,
        })
    }
}

/// Uniformly random colors from a palette, recalled in order.
#[derive(Debug, Clone)]
pub struct ColorSequence {
    palette: Vec<String>,
}

impl ColorSequence {
    /// A generator over a custom palette.
    #[must_use]
    pub fn new<S: AsRef<str>>(palette: &[S]) -> Self {
        Self {
            palette: palette.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }
}

impl Default for ColorSequence {
    fn default() -> Self {
        Self::new(PALETTE)
    }
}

impl StimulusGenerator for ColorSequence {
    fn name(&self) -> &'static str {
        "color_sequence"
    }

    fn validate(&self, params: &RoundParams) -> Result<()> {
        if self.palette.is_empty() {
            return Err(RecallError::params(self.name(), "palette is empty"));
        }
        if params.load == 0 {
            return Err(RecallError::params(self.name(), "sequence length must be at least 1"));
        }
        Ok(())
    }

    fn generate(&self, params: &RoundParams, rng: &mut dyn RngCore) -> Result<Stimulus> {
        self.validate(params)?;

        let colors: Vec<String> = (0..params.load)
            .map(|_| self.palette[rng.gen_range(0..self.palette.len())].clone())
            .collect();

        Ok(Stimulus {
            answer: Answer::Ordered(colors.clone()),
            payload: Payload::Colors { colors },
            load: params.load,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn digit_sequence_has_requested_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let stimulus = SymbolSequence::digits()
            .generate(&RoundParams::load(6), &mut rng)
            .expect("generate");

        let Answer::Text(text) = &stimulus.answer else {
            panic!("expected text answer");
        };
        assert_eq!(text.len(), 6);
        assert!(text.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn same_seed_same_sequence() {
        let generator = SymbolSequence::letters();
        let a = generator
            .generate(&RoundParams::load(8), &mut StdRng::seed_from_u64(42))
            .expect("generate");
        let b = generator
            .generate(&RoundParams::load(8), &mut StdRng::seed_from_u64(42))
            .expect("generate");
        assert_eq!(a, b);
    }

    #[test]
    fn reversed_answer_is_backwards() {
        let mut rng = StdRng::seed_from_u64(3);
        let stimulus = SymbolSequence::digits()
            .reversed()
            .generate(&RoundParams::load(5), &mut rng)
            .expect("generate");

        let Payload::Symbols { symbols } = &stimulus.payload else {
            panic!("expected symbols");
        };
        let backwards: String = symbols.iter().rev().collect();
        assert_eq!(stimulus.answer, Answer::Text(backwards));
    }

    #[test]
    fn zero_length_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = SymbolSequence::digits()
            .generate(&RoundParams::load(0), &mut rng)
            .expect_err("zero length must fail");
        assert!(matches!(err, RecallError::InvalidParams { .. }));
    }

    #[test]
    fn colors_come_from_palette() {
        let mut rng = StdRng::seed_from_u64(9);
        let stimulus = ColorSequence::default()
            .generate(&RoundParams::load(10), &mut rng)
            .expect("generate");
        let Answer::Ordered(colors) = &stimulus.answer else {
            panic!("expected ordered answer");
        };
        assert_eq!(colors.len(), 10);
        assert!(colors.iter().all(|c| PALETTE.contains(&c.as_str())));
    }
}

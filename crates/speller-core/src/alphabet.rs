//! Symbol alphabet.
//!
//! Indices are the canonical identity of a symbol inside the session; the
//! character is only used for display and for decoding model predictions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ConfigError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    /// Build an alphabet from a string of unique characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty or contains duplicates.
    pub fn new(symbols: &str) -> Result<Self, ConfigError> {
        if symbols.is_empty() {
            return Err(ConfigError::invalid("symbols", "alphabet is empty"));
        }
        let mut seen = HashSet::new();
        let mut chars = Vec::with_capacity(symbols.len());
        for c in symbols.chars() {
            if !seen.insert(c) {
                return Err(ConfigError::invalid(
                    "symbols",
                    format!("duplicate symbol '{c}'"),
                ));
            }
            chars.push(c);
        }
        Ok(Self { symbols: chars })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, index: usize) -> Option<char> {
        self.symbols.get(index).copied()
    }

    pub fn index_of(&self, symbol: char) -> Option<usize> {
        self.symbols.iter().position(|&c| c == symbol)
    }

    /// Map every character of `text` to its index.
    pub fn indices(&self, text: &str) -> Result<Vec<usize>, ValidationError> {
        text.chars()
            .map(|symbol| {
                self.index_of(symbol)
                    .ok_or(ValidationError::UnknownSymbol { symbol })
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.symbols.iter().copied()
    }
}

impl TryFrom<String> for Alphabet {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Alphabet> for String {
    fn from(value: Alphabet) -> Self {
        value.symbols.into_iter().collect()
    }
}

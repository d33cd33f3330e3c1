//! Candle direction alphabet and the sequences built from it.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Candle;

/// Categorical encoding of a candle's close relative to its open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Up,
    Down,
    Flat,
}

impl Symbol {
    /// Classify a candle: Down if close < open, Up if close > open, Flat otherwise.
    pub fn from_candle(candle: &Candle) -> Self {
        if candle.close < candle.open {
            Symbol::Down
        } else if candle.close > candle.open {
            Symbol::Up
        } else {
            Symbol::Flat
        }
    }

    /// Canonical one-letter form used by `Display` and `FromStr`.
    pub fn letter(self) -> char {
        match self {
            Symbol::Up => 'U',
            Symbol::Down => 'D',
            Symbol::Flat => 'F',
        }
    }

    /// Parse a single glyph.
    ///
    /// Accepts the canonical letters (any case) and the colour glyphs used by
    /// Russian-language alerts: `З` green, `К` red, `Н` neutral.
    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            'U' | 'u' | 'З' | 'з' => Some(Symbol::Up),
            'D' | 'd' | 'К' | 'к' => Some(Symbol::Down),
            'F' | 'f' | 'Н' | 'н' => Some(Symbol::Flat),
            _ => None,
        }
    }

    /// Forecast label for a candle that followed a historical occurrence.
    pub fn direction(self) -> Direction {
        match self {
            Symbol::Up => Direction::Up,
            Symbol::Flat => Direction::Neutral,
            Symbol::Down => Direction::Down,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Directional label in a forecast template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Neutral,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Up => "Up",
            Direction::Neutral => "Neutral",
            Direction::Down => "Down",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid symbol glyph '{glyph}' at position {position}")]
pub struct SymbolParseError {
    pub glyph: char,
    pub position: usize,
}

/// Chronological symbol sequence: index 0 is the oldest candle, the last
/// index is the most recent one (the tail).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolSequence(Vec<Symbol>);

impl SymbolSequence {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.0
    }

    /// The last `len` symbols (the whole sequence if `len` exceeds it).
    pub fn tail(&self, len: usize) -> &[Symbol] {
        &self.0[self.0.len().saturating_sub(len)..]
    }

    pub fn into_inner(self) -> Vec<Symbol> {
        self.0
    }
}

impl Deref for SymbolSequence {
    type Target = [Symbol];

    fn deref(&self) -> &[Symbol] {
        &self.0
    }
}

impl From<Vec<Symbol>> for SymbolSequence {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }
}

impl FromIterator<Symbol> for SymbolSequence {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for SymbolSequence {
    type Err = SymbolParseError;

    /// Parse a glyph string. Whitespace, commas and dashes are ignored so
    /// grouped input such as `"UUD FFD"` is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .filter(|c| !c.is_whitespace() && *c != ',' && *c != '-')
            .enumerate()
            .map(|(position, glyph)| {
                Symbol::from_glyph(glyph).ok_or(SymbolParseError { glyph, position })
            })
            .collect()
    }
}

impl fmt::Display for SymbolSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.0 {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

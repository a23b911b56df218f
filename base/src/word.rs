//! Whirlwind memory words.
//!
//! The Whirlwind I used 16-bit words holding one's complement
//! numbers: the top bit is the sign and a negative number is the
//! bitwise complement of its magnitude.  So there are two zeroes,
//! 0o000000 and 0o177777 ("negative zero").  A word can also be read
//! as a fraction in the range (-1, 1), which is how the arithmetic
//! unit itself regarded it.
use std::fmt::{self, Debug, Display, Formatter, Octal};

use super::error::ConversionFailed;

#[cfg(test)]
mod tests;

const SIGN_BIT: u16 = 0o100_000;
const MAGNITUDE_BITS: u16 = 0o077_777;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Word(u16);

impl Word {
    pub const ZERO: Word = Word(0);
    pub const NEGATIVE_ZERO: Word = Word(0o177_777);
    pub const MAX: Word = Word(MAGNITUDE_BITS);

    #[must_use]
    pub const fn from_bits(bits: u16) -> Word {
        Word(bits)
    }

    #[must_use]
    pub const fn bits(&self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 & SIGN_BIT != 0
    }

    #[must_use]
    pub const fn is_negative_zero(&self) -> bool {
        self.0 == Word::NEGATIVE_ZERO.0
    }

    /// The magnitude of the word, ignoring its sign.
    #[must_use]
    pub const fn magnitude(&self) -> u16 {
        if self.is_negative() {
            !self.0 & MAGNITUDE_BITS
        } else {
            self.0
        }
    }

    /// Interprets the word as a signed integer.  Both zeroes
    /// convert to 0.
    #[must_use]
    pub fn to_signed(&self) -> i64 {
        let magnitude = i64::from(self.magnitude());
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Interprets the word as a fraction, with the binary point
    /// just to the right of the sign bit.
    #[must_use]
    pub fn to_fraction(&self) -> f64 {
        let f = f64::from(self.magnitude()) / f64::from(SIGN_BIT);
        if self.is_negative() {
            -f
        } else {
            f
        }
    }
}

impl TryFrom<i64> for Word {
    type Error = ConversionFailed;

    fn try_from(n: i64) -> Result<Word, ConversionFailed> {
        let limit = i64::from(MAGNITUDE_BITS);
        if n > limit {
            Err(ConversionFailed::TooLarge(n))
        } else if n < -limit {
            Err(ConversionFailed::TooSmall(n))
        } else {
            let magnitude = n.unsigned_abs() as u16;
            if n < 0 {
                Ok(Word(!magnitude))
            } else {
                Ok(Word(magnitude))
            }
        }
    }
}

impl From<Word> for u16 {
    fn from(w: Word) -> u16 {
        w.0
    }
}

impl Octal for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Octal::fmt(&self.0, f)
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.0)
    }
}

impl Debug for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0o{:06o})", self.0)
    }
}

//! Basic error reporting.

use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

/// Represents a failure to convert a native integer into a [`Word`]
/// or an [`Address`].
///
/// [`Word`]: crate::prelude::Word
/// [`Address`]: crate::prelude::Address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionFailed {
    TooLarge(i64),
    TooSmall(i64),
}

impl Error for ConversionFailed {}

impl Display for ConversionFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ConversionFailed::TooLarge(n) => write!(f, "value {n} is too large"),
            ConversionFailed::TooSmall(n) => write!(f, "value {n} is too small"),
        }
    }
}

use std::fmt::{self, Debug, Display, Formatter, Octal};

use super::error::ConversionFailed;


/// A Whirlwind core memory address.  The machine has 2048 words of
/// core, so addresses have 11 significant bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u16);

impl Address {
    pub const ZERO: Address = Address(0);
    pub const MAX: Address = Address(0o3777);

    #[must_use]
    pub const fn bits(&self) -> u16 {
        self.0
    }
}

impl TryFrom<i64> for Address {
    type Error = ConversionFailed;

    fn try_from(n: i64) -> Result<Address, ConversionFailed> {
        match u16::try_from(n) {
            Err(_) if n < 0 => Err(ConversionFailed::TooSmall(n)),
            Ok(bits) if bits <= Address::MAX.0 => Ok(Address(bits)),
            _ => Err(ConversionFailed::TooLarge(n)),
        }
    }
}

impl From<Address> for u16 {
    fn from(a: Address) -> u16 {
        a.0
    }
}

impl From<Address> for i64 {
    fn from(a: Address) -> i64 {
        i64::from(a.0)
    }
}

impl Octal for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Octal::fmt(&self.0, f)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0o{:o})", self.0)
    }
}

//! The prelude exports the structs which are useful in representing
//! things to do with the Whirlwind.  Providing this prelude is the
//! main purpose of the base crate.
pub use super::address::Address;
pub use super::error::ConversionFailed;
pub use super::word::Word;

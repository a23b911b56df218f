//! The `base` crate defines the Whirlwind-related things which are
//! useful in the parser core, the debugger and the other associated
//! tools.  It has no knowledge of source text; it only knows what a
//! machine word and a memory address look like.

mod address;
mod error;
mod word;

pub mod prelude;

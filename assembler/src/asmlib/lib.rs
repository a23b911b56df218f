//! Lexical and syntactic analysis for the Whirlwind assembler, the
//! tape listing converter and the debugger.
//!
//! Text flows one way: a [`CharacterCursor`] feeds a [`Tokenizer`],
//! whose tokens an [`ExpressionParser`] builds into [`Expression`]
//! trees; a [`LineParser`] assembles those into a [`ParsedLine`]
//! record, and [`Evaluate`] reduces expressions to
//! [`EvaluatedValue`]s against an [`Environment`].
#![warn(unreachable_pub)]
#![deny(unsafe_code)]
#![warn(clippy::must_use_candidate)]
#![warn(clippy::manual_string_new)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::return_self_not_must_use)]
#![warn(clippy::wildcard_imports)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::missing_errors_doc)]
#![warn(clippy::items_after_statements)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::unreadable_literal)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)] // fix soon
#![allow(clippy::missing_panics_doc)] // fix soon
#![allow(clippy::cast_possible_truncation)] // fix soon

pub mod ast;
pub mod cursor;
pub mod debugger;
pub mod driver;
pub mod eval;
pub mod grammar;
pub mod lexer;
pub mod line;
pub mod parser;
pub mod symtab;
pub mod tape;
pub mod types;
pub mod value;

pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use cursor::CharacterCursor;
pub use debugger::{DebugTarget, Debugger, DebuggerError};
pub use driver::{OutputTarget, ParseOptions, ParseSummary, parse_file, rebuild_tape_file};
pub use eval::{EvalError, Evaluate};
pub use grammar::Grammar;
pub use lexer::{Token, TokenKind, Tokenizer};
pub use line::{LineParser, ParsedLine, parse_line};
pub use parser::{ExpressionParser, parse_expression_str};
pub use symtab::{Environment, RegisterAccessor, SymbolError, SymbolTable};
pub use types::{LineNumber, Location, SyntaxError, SyntaxErrorKind, ToolFailure};
pub use value::EvaluatedValue;

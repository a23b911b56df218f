use std::error::Error;
use std::ffi::{OsStr, OsString};
use std::fmt::{self, Display, Formatter};
use std::io::Error as IoError;
use std::path::PathBuf;

/// Line numbers count from 1, as editors and listings do.
pub type LineNumber = u32;

/// The position of the first character of a token (or of the
/// character at which an error was detected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub line: LineNumber,
    /// Counts characters (not bytes) from 0.
    pub column: usize,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        // We count columns from 0 in the implementation, but 1 in error
        // messages.
        write!(f, "line {}, column {}", self.line, self.column + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    IllegalCharacter(char),
    UnterminatedString,
    ExpectedOperand(String),
    EmptyParentheses,
    UnbalancedParentheses,
    BadPrefixAddress,
    BadSectionOffset(String),
    ExpectedOpname,
    ExpectedCommandName(String),
    UnexpectedToken(String),
}

impl Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            SyntaxErrorKind::IllegalCharacter(ch) => write!(f, "Illegal character {ch:?}"),
            SyntaxErrorKind::UnterminatedString => f.write_str("Unterminated string"),
            SyntaxErrorKind::ExpectedOperand(found) => {
                write!(f, "Expected an operand but found {found}")
            }
            SyntaxErrorKind::EmptyParentheses => f.write_str("Empty parentheses"),
            SyntaxErrorKind::UnbalancedParentheses => f.write_str("Unbalanced parentheses"),
            SyntaxErrorKind::BadPrefixAddress => f.write_str("Syntax error in prefix address"),
            SyntaxErrorKind::BadSectionOffset(digits) => {
                write!(f, "Section offset {digits} is out of range")
            }
            SyntaxErrorKind::ExpectedOpname => f.write_str("Opname expected"),
            SyntaxErrorKind::ExpectedCommandName(found) => {
                write!(f, "Expected a command name but found {found}")
            }
            SyntaxErrorKind::UnexpectedToken(found) => write!(f, "Unexpected {found}"),
        }
    }
}

/// A lexical or syntax error.  Both kinds carry the same payload, so
/// that whoever catches them can print the same caret diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub location: Location,
    /// The text of the offending line, without its line terminator.
    pub line_text: String,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, location: Location, line_text: &str) -> SyntaxError {
        SyntaxError {
            kind,
            location,
            line_text: line_text.trim_end_matches(['\r', '\n']).to_string(),
        }
    }

    /// Formats the error as the message, the line text and a caret
    /// under the failing column, each on a line of its own.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        format!(
            "{}: \n{}\n{}^\n",
            self.kind,
            self.line_text,
            " ".repeat(self.location.column)
        )
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}: {}", self.location, self.kind)
    }
}

impl Error for SyntaxError {}

/// Failures of a whole tool run, as opposed to the failure of a
/// single line.
#[derive(Debug)]
pub enum ToolFailure {
    IoErrorOnStdout {
        error: IoError,
    },
    IoErrorOnInput {
        filename: OsString,
        error: IoError,
        line_number: Option<LineNumber>,
    },
    IoErrorOnOutput {
        filename: PathBuf,
        error: IoError,
    },
    /// Some lines could not be parsed or evaluated; they have already
    /// been reported.
    LinesFailed(usize),
    TooManyErrors(usize),
}

fn write_os_string(f: &mut Formatter<'_>, s: &OsStr) -> Result<(), fmt::Error> {
    match s.to_str() {
        Some(unicode_name) => f.write_str(unicode_name),
        None => write!(
            f,
            "{} (some non-Unicode characters changed to make it printable)",
            s.to_string_lossy(),
        ),
    }
}

impl Display for ToolFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ToolFailure::IoErrorOnStdout { error } => {
                write!(f, "error writing on stdout: {error}")
            }
            ToolFailure::IoErrorOnInput {
                filename,
                error,
                line_number,
            } => {
                f.write_str("I/O error reading input file ")?;
                write_os_string(f, filename)?;
                if let Some(n) = line_number {
                    write!(f, " at line {n}")?;
                }
                write!(f, ": {error}")
            }
            ToolFailure::IoErrorOnOutput { filename, error } => {
                write!(
                    f,
                    "I/O error writing output file {}: {error}",
                    filename.display(),
                )
            }
            ToolFailure::LinesFailed(1) => f.write_str("1 line had errors"),
            ToolFailure::LinesFailed(n) => write!(f, "{n} lines had errors"),
            ToolFailure::TooManyErrors(n) => {
                write!(f, "giving up after {n} errors")
            }
        }
    }
}

impl Error for ToolFailure {}

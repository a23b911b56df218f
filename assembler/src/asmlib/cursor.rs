//! One-character lookahead over a line-oriented text stream.
//!
//! The cursor holds only the current line.  When that line is
//! exhausted it reads the next one from the underlying stream.  Once
//! the stream is exhausted the cursor yields `None` indefinitely.
use std::io::BufRead;

use tracing::{Level, event};

use crate::types::{LineNumber, Location};


#[derive(Debug)]
pub struct CharacterCursor<R> {
    input: R,
    chars: Vec<char>,
    text: String,
    position: usize,
    first_line: LineNumber,
    line_number: LineNumber,
    at_end: bool,
}

impl<R: BufRead> CharacterCursor<R> {
    pub fn new(input: R) -> CharacterCursor<R> {
        CharacterCursor::starting_at_line(input, 1)
    }

    /// Creates a cursor whose first line is numbered `first_line`.
    /// This is used when each line of a file gets a cursor of its
    /// own.
    pub fn starting_at_line(input: R, first_line: LineNumber) -> CharacterCursor<R> {
        CharacterCursor {
            input,
            chars: Vec::new(),
            text: String::new(),
            position: 0,
            first_line,
            line_number: first_line.saturating_sub(1),
            at_end: false,
        }
    }

    fn refill(&mut self) {
        while self.position >= self.chars.len() && !self.at_end {
            let mut buf = String::new();
            match self.input.read_line(&mut buf) {
                Ok(0) => {
                    self.at_end = true;
                }
                Ok(_) => {
                    self.line_number += 1;
                    self.chars = buf.chars().collect();
                    self.text = buf;
                    self.position = 0;
                }
                Err(e) => {
                    event!(
                        Level::ERROR,
                        "input error after line {}, treating it as end of input: {e}",
                        self.line_number
                    );
                    self.at_end = true;
                }
            }
        }
    }

    /// Returns the character under the cursor, or `None` at end of
    /// input.
    pub fn current(&mut self) -> Option<char> {
        self.refill();
        self.chars.get(self.position).copied()
    }

    pub fn advance(&mut self) {
        if self.current().is_some() {
            self.position += 1;
        }
    }

    /// The location of the character under the cursor.  At end of
    /// input this is just past the end of the final line.
    pub fn location(&mut self) -> Location {
        self.refill();
        let column = if self.at_end {
            self.position.min(self.line_text().chars().count())
        } else {
            self.position
        };
        Location {
            line: self.line_number.max(self.first_line),
            column,
        }
    }

    /// The text of the line currently buffered, without its line
    /// terminator.
    pub fn line_text(&self) -> &str {
        self.text.trim_end_matches(['\r', '\n'])
    }

    /// Consumes the remainder of the current line (leaving the line
    /// terminator in place) and returns it.
    pub fn rest_of_line(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            result.push(ch);
            self.position += 1;
        }
        result.trim_end_matches('\r').to_string()
    }
}

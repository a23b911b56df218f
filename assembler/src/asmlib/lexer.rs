//! Converts a character stream into a token stream.
//!
//! The tokenizer is a hand-written finite state machine driven one
//! character at a time through a [`CharacterCursor`].  This gives us
//! exact columns for diagnostics and lets us handle the
//! context-sensitive parts of the legacy notation (radix prefixes,
//! labels with a leading digit, `@@` inside comments).
use std::fmt::{self, Display, Formatter};
use std::io::BufRead;

use tracing::{Level, event};

use crate::cursor::CharacterCursor;
use crate::grammar::Grammar;
use crate::types::{LineNumber, Location, SyntaxError, SyntaxErrorKind};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Operator,
    Identifier,
    DigitString,
    StringLiteral,
    Comment,
    AutoComment,
    RecordSeparator,
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// For string literals, the text after escape sequences have been
    /// decoded.  For comments, the text between the delimiters.
    pub text: String,
    pub location: Location,
}

impl Token {
    #[must_use]
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::EndOfStream
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Operator => write!(f, "'{}'", self.text),
            TokenKind::Identifier => write!(f, "identifier {}", self.text),
            TokenKind::DigitString => write!(f, "number {}", self.text),
            TokenKind::StringLiteral => write!(f, "string {:?}", self.text),
            TokenKind::Comment => f.write_str("comment"),
            TokenKind::AutoComment => f.write_str("auto-comment"),
            TokenKind::RecordSeparator => f.write_str("tab"),
            TokenKind::EndOfStream => f.write_str("end of line"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Start,
    /// Seen one `@`.
    AtSign,
    /// Inside an `@@` span, which runs to end of line.
    AutoComment,
    /// Seen a leading `0`, which may be a radix prefix.
    Zero,
    Digits,
    HexDigits,
    Identifier,
    Comment,
    /// Seen one `@` inside a comment.
    CommentAt,
    Quoted,
    QuotedEscape,
    /// Accumulating an opaque run (debugger grammar).
    Run,
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

pub(crate) fn looks_like_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_char)
}

fn without_carriage_return(mut text: String) -> String {
    let len = text.trim_end_matches('\r').len();
    text.truncate(len);
    text
}

#[derive(Debug)]
pub struct Tokenizer<R> {
    cursor: CharacterCursor<R>,
    grammar: Grammar,
    // Only survives between calls after a radix prefix or after the
    // `@@` which splits a comment.
    state: LexState,
}

impl<'a> Tokenizer<&'a [u8]> {
    /// Creates a tokenizer over a single line of text.
    #[must_use]
    pub fn for_line(text: &'a str, line_number: LineNumber, grammar: Grammar) -> Self {
        Tokenizer::with_cursor(
            CharacterCursor::starting_at_line(text.as_bytes(), line_number),
            grammar,
        )
    }
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(input: R, grammar: Grammar) -> Tokenizer<R> {
        Tokenizer::with_cursor(CharacterCursor::new(input), grammar)
    }

    pub fn with_cursor(cursor: CharacterCursor<R>, grammar: Grammar) -> Tokenizer<R> {
        Tokenizer {
            cursor,
            grammar,
            state: LexState::Start,
        }
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    pub fn line_text(&self) -> &str {
        self.cursor.line_text()
    }

    pub fn location(&mut self) -> Location {
        self.cursor.location()
    }

    pub(crate) fn rest_of_line(&mut self) -> String {
        self.cursor.rest_of_line()
    }

    fn emit(&mut self, kind: TokenKind, text: String, location: Location) -> Token {
        self.emit_then(kind, text, location, LexState::Start)
    }

    fn emit_then(
        &mut self,
        kind: TokenKind,
        text: String,
        location: Location,
        next: LexState,
    ) -> Token {
        self.state = next;
        let token = Token {
            kind,
            text,
            location,
        };
        event!(Level::TRACE, "token {token:?}");
        token
    }

    fn error_here(&mut self, kind: SyntaxErrorKind) -> SyntaxError {
        self.state = LexState::Start;
        let location = self.cursor.location();
        SyntaxError::new(kind, location, self.cursor.line_text())
    }

    fn unterminated(&mut self, start: Location) -> SyntaxError {
        self.state = LexState::Start;
        SyntaxError::new(
            SyntaxErrorKind::UnterminatedString,
            start,
            self.cursor.line_text(),
        )
    }

    /// Whether `ch` ends a number or a name.
    fn is_terminator(&self, ch: char) -> bool {
        ch.is_whitespace()
            || self.grammar.is_operator(ch)
            || (ch == ';' && self.grammar.has_semicolon_comments())
            || (ch == '@' && self.grammar.has_at_sign())
    }

    /// Returns the raw text up to the next tab or the end of the line
    /// as a [`TokenKind::Comment`] token.  Tape listings use this for
    /// their free-form comment fields.
    pub fn next_raw_field(&mut self) -> Token {
        let start = self.cursor.location();
        let mut text = String::new();
        while let Some(ch) = self.cursor.current() {
            if ch == '\t' || ch == '\n' {
                break;
            }
            text.push(ch);
            self.cursor.advance();
        }
        self.emit(TokenKind::Comment, without_carriage_return(text), start)
    }

    /// Returns the next token.  Once the input is exhausted, every
    /// call returns a [`TokenKind::EndOfStream`] token.
    ///
    /// # Errors
    ///
    /// Fails on a character which cannot begin or continue any token,
    /// and on a string literal which is still open at end of line.
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let mut text = String::new();
        let mut start = self.cursor.location();
        loop {
            let current = self.cursor.current();
            match self.state {
                LexState::Start => {
                    let Some(ch) = current else {
                        let end = self.cursor.location();
                        return Ok(self.emit(TokenKind::EndOfStream, text, end));
                    };
                    start = self.cursor.location();
                    if ch == '\t' && self.grammar.tab_separates_records() {
                        self.cursor.advance();
                        text.push(ch);
                        return Ok(self.emit(TokenKind::RecordSeparator, text, start));
                    } else if ch.is_whitespace() {
                        self.cursor.advance();
                    } else if ch == '"' {
                        self.cursor.advance();
                        self.state = LexState::Quoted;
                    } else if ch == ';' && self.grammar.has_semicolon_comments() {
                        self.cursor.advance();
                        self.state = LexState::Comment;
                    } else if ch == '@' && self.grammar.has_at_sign() {
                        self.cursor.advance();
                        self.state = LexState::AtSign;
                    } else if self.grammar.is_operator(ch) {
                        self.cursor.advance();
                        text.push(ch);
                        return Ok(self.emit(TokenKind::Operator, text, start));
                    } else if self.grammar.has_opaque_runs() {
                        self.cursor.advance();
                        text.push(ch);
                        self.state = LexState::Run;
                    } else if ch == '0' {
                        self.cursor.advance();
                        text.push(ch);
                        self.state = LexState::Zero;
                    } else if ch.is_ascii_digit() {
                        self.cursor.advance();
                        text.push(ch);
                        self.state = LexState::Digits;
                    } else if is_identifier_start(ch) {
                        self.cursor.advance();
                        text.push(ch);
                        self.state = LexState::Identifier;
                    } else {
                        return Err(self.error_here(SyntaxErrorKind::IllegalCharacter(ch)));
                    }
                }
                LexState::AtSign => {
                    if current == Some('@') {
                        self.cursor.advance();
                        self.state = LexState::AutoComment;
                    } else {
                        text.push('@');
                        return Ok(self.emit(TokenKind::Operator, text, start));
                    }
                }
                LexState::AutoComment => match current {
                    None | Some('\n') => {
                        let text = without_carriage_return(text);
                        return Ok(self.emit(TokenKind::AutoComment, text, start));
                    }
                    Some(ch) => {
                        text.push(ch);
                        self.cursor.advance();
                    }
                },
                LexState::Comment => match current {
                    None | Some('\n') => {
                        let text = without_carriage_return(text);
                        return Ok(self.emit(TokenKind::Comment, text, start));
                    }
                    Some('@') => {
                        self.cursor.advance();
                        self.state = LexState::CommentAt;
                    }
                    Some(ch) => {
                        text.push(ch);
                        self.cursor.advance();
                    }
                },
                LexState::CommentAt => {
                    if current == Some('@') {
                        self.cursor.advance();
                        return Ok(self.emit_then(
                            TokenKind::Comment,
                            text,
                            start,
                            LexState::AutoComment,
                        ));
                    }
                    text.push('@');
                    self.state = LexState::Comment;
                }
                LexState::Zero => match current {
                    Some('o') => {
                        self.cursor.advance();
                        return Ok(self.emit_then(
                            TokenKind::Operator,
                            String::from("0o"),
                            start,
                            LexState::Digits,
                        ));
                    }
                    Some('x') => {
                        self.cursor.advance();
                        return Ok(self.emit_then(
                            TokenKind::Operator,
                            String::from("0x"),
                            start,
                            LexState::HexDigits,
                        ));
                    }
                    Some(ch) if ch.is_ascii_digit() => {
                        self.state = LexState::Digits;
                    }
                    Some(ch) if is_identifier_char(ch) => {
                        self.state = LexState::Identifier;
                    }
                    Some(ch) if !self.is_terminator(ch) => {
                        return Err(self.error_here(SyntaxErrorKind::IllegalCharacter(ch)));
                    }
                    _ => {
                        return Ok(self.emit(TokenKind::DigitString, text, start));
                    }
                },
                LexState::Digits | LexState::HexDigits => match current {
                    Some(ch)
                        if ch.is_ascii_digit()
                            || (self.state == LexState::HexDigits && ch.is_ascii_hexdigit()) =>
                    {
                        text.push(ch);
                        self.cursor.advance();
                    }
                    Some(ch) if is_identifier_char(ch) => {
                        text.push(ch);
                        self.cursor.advance();
                        self.state = LexState::Identifier;
                    }
                    Some(ch) if !self.is_terminator(ch) => {
                        return Err(self.error_here(SyntaxErrorKind::IllegalCharacter(ch)));
                    }
                    _ => {
                        if text.is_empty() {
                            // A radix prefix with no digits after it.
                            self.state = LexState::Start;
                        } else {
                            return Ok(self.emit(TokenKind::DigitString, text, start));
                        }
                    }
                },
                LexState::Identifier => match current {
                    Some(ch) if is_identifier_char(ch) => {
                        text.push(ch);
                        self.cursor.advance();
                    }
                    Some(ch) if !self.is_terminator(ch) => {
                        return Err(self.error_here(SyntaxErrorKind::IllegalCharacter(ch)));
                    }
                    _ => {
                        return Ok(self.emit(TokenKind::Identifier, text, start));
                    }
                },
                LexState::Quoted => match current {
                    None | Some('\n') => {
                        return Err(self.unterminated(start));
                    }
                    Some('"') => {
                        self.cursor.advance();
                        return Ok(self.emit(TokenKind::StringLiteral, text, start));
                    }
                    Some('\\') => {
                        self.cursor.advance();
                        self.state = LexState::QuotedEscape;
                    }
                    Some(ch) => {
                        text.push(ch);
                        self.cursor.advance();
                    }
                },
                LexState::QuotedEscape => {
                    let decoded = match current {
                        None | Some('\n') => {
                            return Err(self.unterminated(start));
                        }
                        Some('n') => Some('\n'),
                        Some('t') => Some('\t'),
                        Some('b') => Some('\u{8}'),
                        Some('"') => Some('"'),
                        Some('\\') => Some('\\'),
                        Some(_) => None,
                    };
                    match decoded {
                        Some(ch) => {
                            text.push(ch);
                            self.cursor.advance();
                        }
                        None => {
                            // Unknown escapes keep their backslash.
                            text.push('\\');
                        }
                    }
                    self.state = LexState::Quoted;
                }
                LexState::Run => match current {
                    Some(ch)
                        if !(ch.is_whitespace() || ch == '"' || self.grammar.is_operator(ch)) =>
                    {
                        text.push(ch);
                        self.cursor.advance();
                    }
                    _ => {
                        let kind = if looks_like_identifier(&text) {
                            TokenKind::Identifier
                        } else {
                            TokenKind::DigitString
                        };
                        return Ok(self.emit(kind, text, start));
                    }
                },
            }
        }
    }
}

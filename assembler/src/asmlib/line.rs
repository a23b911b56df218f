//! Per-line parsing.
//!
//! A [`LineParser`] owns a fresh tokenizer and expression parser for
//! exactly one line, so an error on one line cannot disturb the
//! parsing of the next.
use std::fmt::{self, Display, Formatter};
use std::io::BufRead;

use tracing::{Level, event};

use crate::ast::Expression;
use crate::grammar::Grammar;
use crate::lexer::{Token, TokenKind};
use crate::parser::ExpressionParser;
use crate::types::{LineNumber, SyntaxError, SyntaxErrorKind};

#[cfg(test)]
mod tests;

/// The `@address:contents` (or `@address.offset:contents`) prefix
/// which listings put at the start of a line.  The fields are kept
/// as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixAddress {
    pub address: String,
    pub offset: Option<String>,
    pub contents: String,
}

impl Display for PrefixAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.address)?;
        if let Some(offset) = &self.offset {
            write!(f, ".{offset}")?;
        }
        write!(f, ":{}", self.contents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLine {
    pub raw_text: String,
    pub line_number: LineNumber,
    /// Tape listings: the section-relative offset of the word.
    pub prefix_offset: Option<i64>,
    pub prefix_address: Option<PrefixAddress>,
    /// The atom of a `.if` prefix.
    pub condition: Option<Expression>,
    pub label: Option<String>,
    /// Empty if the line carries no instruction.
    pub opcode: String,
    /// Whether the opcode was written with a leading `.`.
    pub is_directive: bool,
    pub operand: Option<Expression>,
    /// Tape listings: the free-form field before the first tab.
    pub prefix_comment: String,
    pub postfix_comment: String,
    pub auto_comment: String,
}

/// Directives whose operand is the rest of the line, unparsed.
const RAW_OPERAND_DIRECTIVES: [&str; 2] = ["exec", "print"];

impl ParsedLine {
    #[must_use]
    pub fn has_instruction(&self) -> bool {
        !self.opcode.is_empty()
    }

    fn takes_raw_operand(&self) -> bool {
        self.is_directive && RAW_OPERAND_DIRECTIVES.contains(&self.opcode.as_str())
    }
}

/// Reconstructs the line in canonical assembly form.
impl Display for ParsedLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<String> = Vec::new();
        if let Some(prefix) = &self.prefix_address {
            fields.push(prefix.to_string());
        }
        if let Some(condition) = &self.condition {
            fields.push(format!(".if {condition}"));
        }
        if let Some(label) = &self.label {
            fields.push(format!("{label}:"));
        }
        if self.has_instruction() {
            let dot = if self.is_directive { "." } else { "" };
            fields.push(format!("{dot}{}", self.opcode));
            match &self.operand {
                Some(Expression::LiteralString(raw)) if self.takes_raw_operand() => {
                    fields.push(raw.clone());
                }
                Some(operand) => fields.push(operand.to_string()),
                None => (),
            }
        } else if let Some(operand) = &self.operand {
            fields.push(operand.to_string());
        }
        if !self.postfix_comment.is_empty() {
            fields.push(format!("; {}", self.postfix_comment));
        }
        if !self.auto_comment.is_empty() {
            fields.push(format!("@@ {}", self.auto_comment));
        }
        f.write_str(&fields.join(" "))
    }
}

fn starts_operand(token: &Token) -> bool {
    !matches!(
        token.kind,
        TokenKind::EndOfStream
            | TokenKind::Comment
            | TokenKind::AutoComment
            | TokenKind::RecordSeparator
    )
}

#[derive(Debug)]
pub struct LineParser<R> {
    parser: ExpressionParser<R>,
    line: ParsedLine,
}

impl<'a> LineParser<&'a [u8]> {
    #[must_use]
    pub fn new(text: &'a str, line_number: LineNumber, grammar: Grammar) -> Self {
        LineParser {
            parser: ExpressionParser::for_line(text, line_number, grammar),
            line: ParsedLine {
                raw_text: text.trim_end_matches(['\r', '\n']).to_string(),
                line_number,
                ..ParsedLine::default()
            },
        }
    }
}

impl<R: BufRead> LineParser<R> {
    /// Parses the line into the record available from
    /// [`LineParser::parsed_line`].  Returns `false` for lines which
    /// carry no instruction (blank lines, comment-only lines and so
    /// on); that is not an error.
    ///
    /// # Errors
    ///
    /// Fails if the line is malformed.
    pub fn parse_line(&mut self) -> Result<bool, SyntaxError> {
        let has_instruction = match self.parser.grammar() {
            Grammar::Assembly => self.parse_assembly_line()?,
            Grammar::Tape => self.parse_tape_line()?,
            Grammar::Debugger => self.parse_debugger_line()?,
            Grammar::Expression => self.parse_expression_line()?,
        };
        event!(
            Level::DEBUG,
            "line {}: instruction={has_instruction} {:?}",
            self.line.line_number,
            self.line
        );
        Ok(has_instruction)
    }

    #[must_use]
    pub fn parsed_line(&self) -> &ParsedLine {
        &self.line
    }

    #[must_use]
    pub fn into_parsed_line(self) -> ParsedLine {
        self.line
    }

    fn unexpected(&self, token: &Token) -> SyntaxError {
        self.parser
            .error_at(token, SyntaxErrorKind::UnexpectedToken(token.to_string()))
    }

    fn parse_assembly_line(&mut self) -> Result<bool, SyntaxError> {
        self.parse_prefix_address()?;
        let token = self.parser.next_token()?;
        let has_instruction = if token.is_operator(".") {
            let name = self.parser.next_token()?;
            if name.kind == TokenKind::Identifier && name.text == "if" {
                self.line.condition = Some(self.parser.parse_atom()?);
                self.parse_label_and_instruction()?
            } else {
                self.parse_directive(name)?
            }
        } else {
            self.parser.unget_token(token);
            self.parse_label_and_instruction()?
        };
        self.parse_comments()?;
        self.parser.expect_end()?;
        Ok(has_instruction)
    }

    fn expect_prefix_digits(&mut self) -> Result<String, SyntaxError> {
        let token = self.parser.next_token()?;
        if token.kind == TokenKind::DigitString {
            Ok(token.text)
        } else {
            Err(self
                .parser
                .error_at(&token, SyntaxErrorKind::BadPrefixAddress))
        }
    }

    fn expect_prefix_operator(&mut self, op: &str) -> Result<(), SyntaxError> {
        let token = self.parser.next_token()?;
        if token.is_operator(op) {
            Ok(())
        } else {
            Err(self
                .parser
                .error_at(&token, SyntaxErrorKind::BadPrefixAddress))
        }
    }

    fn parse_prefix_address(&mut self) -> Result<(), SyntaxError> {
        let token = self.parser.next_token()?;
        if !token.is_operator("@") {
            self.parser.unget_token(token);
            return Ok(());
        }
        let address = self.expect_prefix_digits()?;
        let token = self.parser.next_token()?;
        let offset = if token.is_operator(".") {
            let offset = self.expect_prefix_digits()?;
            self.expect_prefix_operator(":")?;
            Some(offset)
        } else if token.is_operator(":") {
            None
        } else {
            return Err(self
                .parser
                .error_at(&token, SyntaxErrorKind::BadPrefixAddress));
        };
        let contents = self.expect_prefix_digits()?;
        self.line.prefix_address = Some(PrefixAddress {
            address,
            offset,
            contents,
        });
        Ok(())
    }

    fn parse_label_and_instruction(&mut self) -> Result<bool, SyntaxError> {
        let token = self.parser.next_token()?;
        if token.kind != TokenKind::Identifier {
            self.parser.unget_token(token);
            return self.parse_instruction();
        }
        let after = self.parser.next_token()?;
        if after.is_operator(":") {
            self.line.label = Some(token.text);
            self.parse_instruction()
        } else {
            self.parser.unget_token(after);
            self.line.opcode = token.text;
            self.parse_operand()?;
            Ok(true)
        }
    }

    /// Parses an opcode (a name, or a `.`-prefixed directive name) and
    /// its operand, if there is one.
    fn parse_instruction(&mut self) -> Result<bool, SyntaxError> {
        let token = self.parser.next_token()?;
        if token.kind == TokenKind::Identifier {
            self.line.opcode = token.text;
            self.parse_operand()?;
            Ok(true)
        } else if token.is_operator(".") {
            let name = self.parser.next_token()?;
            self.parse_directive(name)
        } else {
            self.parser.unget_token(token);
            Ok(false)
        }
    }

    /// `name` is the token after the `.`.
    fn parse_directive(&mut self, name: Token) -> Result<bool, SyntaxError> {
        if name.kind != TokenKind::Identifier {
            return Err(self.parser.error_at(&name, SyntaxErrorKind::ExpectedOpname));
        }
        self.line.opcode = name.text;
        self.line.is_directive = true;
        if self.line.takes_raw_operand() && !self.parser.has_pending_tokens() {
            let raw = self.parser.tokenizer_mut().rest_of_line();
            let raw = raw.trim();
            if !raw.is_empty() {
                self.line.operand = Some(Expression::LiteralString(raw.to_string()));
            }
        } else {
            self.parse_operand()?;
        }
        Ok(true)
    }

    fn parse_operand(&mut self) -> Result<(), SyntaxError> {
        if starts_operand(&self.parser.peek_token()?) {
            self.line.operand = Some(self.parser.parse_expression()?);
        }
        Ok(())
    }

    fn parse_comments(&mut self) -> Result<(), SyntaxError> {
        let mut token = self.parser.next_token()?;
        if token.kind == TokenKind::Comment {
            self.line.postfix_comment = token.text.trim().to_string();
            token = self.parser.next_token()?;
        }
        if token.kind == TokenKind::AutoComment {
            self.line.auto_comment = token.text.trim().to_string();
        } else {
            self.parser.unget_token(token);
        }
        Ok(())
    }

    fn parse_tape_line(&mut self) -> Result<bool, SyntaxError> {
        let field = self.parser.tokenizer_mut().next_raw_field();
        self.line.prefix_comment = field.text.trim().to_string();
        let token = self.parser.next_token()?;
        match token.kind {
            TokenKind::EndOfStream => return Ok(false),
            TokenKind::RecordSeparator => (),
            _ => return Err(self.unexpected(&token)),
        }

        let token = self.parser.next_token()?;
        match token.kind {
            TokenKind::DigitString => {
                let offset = token.text.parse::<i64>().map_err(|_| {
                    self.parser.error_at(
                        &token,
                        SyntaxErrorKind::BadSectionOffset(token.text.clone()),
                    )
                })?;
                self.line.prefix_offset = Some(offset);
                let separator = self.parser.next_token()?;
                if separator.kind != TokenKind::RecordSeparator {
                    self.parser.unget_token(separator);
                }
            }
            // An empty offset field.
            TokenKind::RecordSeparator => (),
            _ => self.parser.unget_token(token),
        }

        let has_instruction = self.parse_instruction()?;

        let token = self.parser.next_token()?;
        match token.kind {
            TokenKind::RecordSeparator if !self.parser.has_pending_tokens() => {
                let rest = self.parser.tokenizer_mut().rest_of_line();
                self.line.postfix_comment = rest.trim().to_string();
            }
            TokenKind::Comment => {
                self.line.postfix_comment = token.text.trim().to_string();
            }
            TokenKind::EndOfStream => return Ok(has_instruction),
            _ => return Err(self.unexpected(&token)),
        }
        self.parser.expect_end()?;
        Ok(has_instruction)
    }

    fn parse_debugger_line(&mut self) -> Result<bool, SyntaxError> {
        let token = self.parser.next_token()?;
        match token.kind {
            TokenKind::EndOfStream => Ok(false),
            TokenKind::Identifier => {
                self.line.opcode = token.text;
                self.parse_operand()?;
                self.parser.expect_end()?;
                Ok(true)
            }
            _ => Err(self.parser.error_at(
                &token,
                SyntaxErrorKind::ExpectedCommandName(token.to_string()),
            )),
        }
    }

    fn parse_expression_line(&mut self) -> Result<bool, SyntaxError> {
        self.parse_operand()?;
        let token = self.parser.next_token()?;
        if !token.is_operator(";") {
            self.parser.unget_token(token);
        }
        self.parser.expect_end()?;
        Ok(self.line.operand.is_some())
    }
}

/// Parses one line of text with a fresh parser.
///
/// # Errors
///
/// Fails if the line is malformed.
pub fn parse_line(
    text: &str,
    line_number: LineNumber,
    grammar: Grammar,
) -> Result<ParsedLine, SyntaxError> {
    let mut parser = LineParser::new(text, line_number, grammar);
    parser.parse_line()?;
    Ok(parser.into_parsed_line())
}

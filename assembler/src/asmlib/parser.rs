//! Recursive-descent expression parser with explicit precedence
//! levels.
//!
//! From loosest to tightest binding the levels are: comma,
//! assignment, additive, multiplicative, bitwise and, bitwise or,
//! dot, unary prefix, postfix application and atoms.  Note that dot
//! binds more tightly than the bitwise operators, and that the
//! bitwise operators bind more tightly than arithmetic.  That is how
//! the legacy notation works, so don't "fix" it.
use std::io::BufRead;

use tracing::{Level, event};

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::grammar::Grammar;
use crate::lexer::{Token, TokenKind, Tokenizer};
use crate::types::{LineNumber, SyntaxError, SyntaxErrorKind};


/// The grammars need at most two tokens of lookahead; the extra
/// room is slack.
pub(crate) const PUSHBACK_CAPACITY: usize = 4;

/// A small LIFO of tokens which were read and then handed back.
#[derive(Debug, Default)]
struct PushbackBuffer {
    slots: [Option<Token>; PUSHBACK_CAPACITY],
    len: usize,
}

impl PushbackBuffer {
    fn push(&mut self, token: Token) {
        if self.len == PUSHBACK_CAPACITY {
            panic!("token pushback buffer overflow (capacity {PUSHBACK_CAPACITY})");
        }
        self.slots[self.len] = Some(token);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<Token> {
        if self.len == 0 {
            None
        } else {
            self.len -= 1;
            self.slots[self.len].take()
        }
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn binary_operator(token: &Token, candidates: &[BinaryOperator]) -> Option<BinaryOperator> {
    if token.kind != TokenKind::Operator {
        return None;
    }
    candidates
        .iter()
        .copied()
        .find(|op| op.symbol() == token.text)
}

fn unary_operator(token: &Token) -> Option<UnaryOperator> {
    if token.kind != TokenKind::Operator {
        return None;
    }
    match token.text.as_str() {
        "+" => Some(UnaryOperator::Plus),
        "-" => Some(UnaryOperator::Minus),
        "0o" => Some(UnaryOperator::OctalPrefix),
        "0x" => Some(UnaryOperator::HexPrefix),
        _ => None,
    }
}

type LevelFn<R> = fn(&mut ExpressionParser<R>) -> Result<Expression, SyntaxError>;

#[derive(Debug)]
pub struct ExpressionParser<R> {
    tokenizer: Tokenizer<R>,
    pushback: PushbackBuffer,
}

impl<'a> ExpressionParser<&'a [u8]> {
    #[must_use]
    pub fn for_line(text: &'a str, line_number: LineNumber, grammar: Grammar) -> Self {
        ExpressionParser::new(Tokenizer::for_line(text, line_number, grammar))
    }
}

impl<R: BufRead> ExpressionParser<R> {
    pub fn new(tokenizer: Tokenizer<R>) -> ExpressionParser<R> {
        ExpressionParser {
            tokenizer,
            pushback: PushbackBuffer::default(),
        }
    }

    pub fn grammar(&self) -> Grammar {
        self.tokenizer.grammar()
    }

    /// Returns the most recently pushed-back token if there is one,
    /// otherwise the next token from the tokenizer.
    ///
    /// # Errors
    ///
    /// Propagates lexical errors from the tokenizer.
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        match self.pushback.pop() {
            Some(token) => Ok(token),
            None => self.tokenizer.next_token(),
        }
    }

    /// Hands a token back; it will be returned by the next call to
    /// [`ExpressionParser::next_token`].
    ///
    /// # Panics
    ///
    /// Panics if more tokens are pushed back than the buffer holds.
    /// The grammars never need to do that.
    pub fn unget_token(&mut self, token: Token) {
        self.pushback.push(token);
    }

    /// # Errors
    ///
    /// Propagates lexical errors from the tokenizer.
    pub fn peek_token(&mut self) -> Result<Token, SyntaxError> {
        let token = self.next_token()?;
        self.unget_token(token.clone());
        Ok(token)
    }

    pub(crate) fn has_pending_tokens(&self) -> bool {
        !self.pushback.is_empty()
    }

    pub(crate) fn tokenizer_mut(&mut self) -> &mut Tokenizer<R> {
        &mut self.tokenizer
    }

    pub(crate) fn error_at(&self, token: &Token, kind: SyntaxErrorKind) -> SyntaxError {
        event!(
            Level::DEBUG,
            "syntax error at {}: {kind}",
            token.location
        );
        SyntaxError::new(kind, token.location, self.tokenizer.line_text())
    }

    pub(crate) fn expect_end(&mut self) -> Result<(), SyntaxError> {
        let token = self.next_token()?;
        if token.is_end() {
            Ok(())
        } else {
            Err(self.error_at(&token, SyntaxErrorKind::UnexpectedToken(token.to_string())))
        }
    }

    /// Parses one expression, leaving whatever follows it unread.
    ///
    /// # Errors
    ///
    /// Fails on any lexical or syntax error.
    pub fn parse_expression(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_comma()
    }

    /// Parses one expression which must make up the whole input.
    ///
    /// # Errors
    ///
    /// Fails on any lexical or syntax error, or if anything follows
    /// the expression.
    pub fn parse_complete_expression(&mut self) -> Result<Expression, SyntaxError> {
        let expr = self.parse_expression()?;
        self.expect_end()?;
        Ok(expr)
    }

    /// Parses `;`-separated expressions until the input is exhausted.
    /// Empty statements are skipped.
    ///
    /// # Errors
    ///
    /// Fails on the first lexical or syntax error.
    pub fn parse_statements(&mut self) -> Result<Vec<Expression>, SyntaxError> {
        let mut statements = Vec::new();
        loop {
            let token = self.next_token()?;
            if token.is_end() {
                return Ok(statements);
            }
            if token.is_operator(";") {
                continue;
            }
            self.unget_token(token);
            statements.push(self.parse_expression()?);
            let terminator = self.next_token()?;
            if terminator.is_end() {
                return Ok(statements);
            }
            if !terminator.is_operator(";") {
                return Err(self.error_at(
                    &terminator,
                    SyntaxErrorKind::UnexpectedToken(terminator.to_string()),
                ));
            }
        }
    }

    fn parse_right_associative(
        &mut self,
        op: BinaryOperator,
        same_level: LevelFn<R>,
        next_level: LevelFn<R>,
    ) -> Result<Expression, SyntaxError> {
        let left = next_level(self)?;
        let token = self.next_token()?;
        if binary_operator(&token, &[op]).is_some() {
            let right = same_level(self)?;
            Ok(Expression::binary(op, left, right))
        } else {
            self.unget_token(token);
            Ok(left)
        }
    }

    fn parse_left_associative(
        &mut self,
        operators: &[BinaryOperator],
        next_level: LevelFn<R>,
    ) -> Result<Expression, SyntaxError> {
        let mut left = next_level(self)?;
        loop {
            let token = self.next_token()?;
            match binary_operator(&token, operators) {
                Some(op) => {
                    let right = next_level(self)?;
                    left = Expression::binary(op, left, right);
                }
                None => {
                    self.unget_token(token);
                    return Ok(left);
                }
            }
        }
    }

    fn parse_comma(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_right_associative(
            BinaryOperator::Comma,
            Self::parse_comma,
            Self::parse_assignment,
        )
    }

    fn parse_assignment(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_right_associative(
            BinaryOperator::Assign,
            Self::parse_assignment,
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_left_associative(
            &[BinaryOperator::Plus, BinaryOperator::Minus],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_left_associative(
            &[BinaryOperator::Multiply, BinaryOperator::Divide],
            Self::parse_bit_and,
        )
    }

    fn parse_bit_and(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_left_associative(&[BinaryOperator::BitAnd], Self::parse_bit_or)
    }

    fn parse_bit_or(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_left_associative(&[BinaryOperator::BitOr], Self::parse_dot)
    }

    fn parse_dot(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_left_associative(&[BinaryOperator::Dot], Self::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.next_token()?;
        let Some(op) = unary_operator(&token) else {
            self.unget_token(token);
            return self.parse_postfix();
        };
        if op == UnaryOperator::Minus && self.peek_token()?.is_operator(")") {
            // The legacy idiom "(-)" stands for zero.
            return Ok(Expression::digits("0"));
        }
        let operand = self.parse_unary()?;
        Ok(Expression::unary(op, operand))
    }

    fn parse_postfix(&mut self) -> Result<Expression, SyntaxError> {
        let callee = self.parse_atom()?;
        let token = self.next_token()?;
        if token.is_operator("(") {
            let arguments = self.parse_parenthesized()?;
            Ok(Expression::binary(BinaryOperator::Apply, callee, arguments))
        } else {
            self.unget_token(token);
            Ok(callee)
        }
    }

    /// Parses the contents of a parenthesized group and its closing
    /// parenthesis; the opening one has already been consumed.
    fn parse_parenthesized(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.peek_token()?;
        if token.is_end() {
            return Err(self.error_at(&token, SyntaxErrorKind::UnbalancedParentheses));
        }
        if token.is_operator(")") {
            return Err(self.error_at(&token, SyntaxErrorKind::EmptyParentheses));
        }
        let inner = self.parse_expression()?;
        let close = self.next_token()?;
        if close.is_operator(")") {
            Ok(inner)
        } else {
            Err(self.error_at(&close, SyntaxErrorKind::UnbalancedParentheses))
        }
    }

    /// Parses a literal, an identifier or a parenthesized expression.
    ///
    /// # Errors
    ///
    /// Fails if the next token cannot begin an atom.
    pub fn parse_atom(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.next_token()?;
        match token.kind {
            TokenKind::DigitString => Ok(Expression::LiteralDigits(token.text)),
            TokenKind::Identifier => Ok(Expression::Identifier(token.text)),
            TokenKind::StringLiteral => Ok(Expression::LiteralString(token.text)),
            TokenKind::Operator if token.text == "(" => self.parse_parenthesized(),
            _ => Err(self.error_at(&token, SyntaxErrorKind::ExpectedOperand(token.to_string()))),
        }
    }
}

/// Parses `text` (a single line) as one complete expression.
///
/// # Errors
///
/// Fails on any lexical or syntax error.
pub fn parse_expression_str(text: &str, grammar: Grammar) -> Result<Expression, SyntaxError> {
    let expr = ExpressionParser::for_line(text, 1, grammar).parse_complete_expression()?;
    event!(Level::DEBUG, "parsed {text:?} as {expr:?}");
    Ok(expr)
}

//! Expression trees.
//!
//! Each node owns its children, so a tree has no sharing and no
//! cycles.  Chains of the comma operator are right-associated and
//! stand for argument lists.
use std::fmt::{self, Display, Formatter, Write};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    /// Field or section qualification, `section.offset`.
    Dot,
    BitAnd,
    BitOr,
    /// Sequencing; builds argument lists.
    Comma,
    Assign,
    /// Postfix application, `atom(args)`.  The right operand holds
    /// the arguments.
    Apply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
    OctalPrefix,
    HexPrefix,
}

/// Binding strength of each level of the grammar, loosest first.
pub(crate) mod precedence {
    pub(crate) const COMMA: u8 = 1;
    pub(crate) const ASSIGN: u8 = 2;
    pub(crate) const ADDITIVE: u8 = 3;
    pub(crate) const MULTIPLICATIVE: u8 = 4;
    pub(crate) const BIT_AND: u8 = 5;
    pub(crate) const BIT_OR: u8 = 6;
    pub(crate) const DOT: u8 = 7;
    pub(crate) const UNARY: u8 = 8;
    pub(crate) const APPLY: u8 = 9;
    pub(crate) const ATOM: u8 = 10;
}

impl BinaryOperator {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Dot => ".",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::Comma => ",",
            BinaryOperator::Assign => "=",
            BinaryOperator::Apply => "()",
        }
    }

    pub(crate) fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Comma => precedence::COMMA,
            BinaryOperator::Assign => precedence::ASSIGN,
            BinaryOperator::Plus | BinaryOperator::Minus => precedence::ADDITIVE,
            BinaryOperator::Multiply | BinaryOperator::Divide => precedence::MULTIPLICATIVE,
            BinaryOperator::BitAnd => precedence::BIT_AND,
            BinaryOperator::BitOr => precedence::BIT_OR,
            BinaryOperator::Dot => precedence::DOT,
            BinaryOperator::Apply => precedence::APPLY,
        }
    }

    fn is_right_associative(self) -> bool {
        matches!(self, BinaryOperator::Comma | BinaryOperator::Assign)
    }
}

impl UnaryOperator {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::OctalPrefix => "0o",
            UnaryOperator::HexPrefix => "0x",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Identifier(String),
    LiteralString(String),
    /// The digits exactly as written; their radix is decided by the
    /// evaluator.
    LiteralDigits(String),
}

impl Expression {
    #[must_use]
    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn unary(op: UnaryOperator, operand: Expression) -> Expression {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    #[must_use]
    pub fn identifier(name: &str) -> Expression {
        Expression::Identifier(name.to_string())
    }

    #[must_use]
    pub fn digits(digits: &str) -> Expression {
        Expression::LiteralDigits(digits.to_string())
    }

    #[must_use]
    pub fn string(s: &str) -> Expression {
        Expression::LiteralString(s.to_string())
    }

    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expression::Binary { op, .. } => op.precedence(),
            Expression::Unary { .. } => precedence::UNARY,
            Expression::Identifier(_)
            | Expression::LiteralString(_)
            | Expression::LiteralDigits(_) => precedence::ATOM,
        }
    }

    /// Flattens a right-associated comma chain into its elements, in
    /// left-to-right order.  Any other expression is a list of one.
    #[must_use]
    pub fn arguments(&self) -> Vec<&Expression> {
        let mut result = Vec::new();
        let mut node = self;
        while let Expression::Binary {
            op: BinaryOperator::Comma,
            left,
            right,
        } = node
        {
            result.push(left.as_ref());
            node = right.as_ref();
        }
        result.push(node);
        result
    }

    fn quote_if_identifier(&mut self) {
        if let Expression::Identifier(name) = self {
            let name = std::mem::take(name);
            *self = Expression::LiteralString(name);
        }
    }

    /// Turns bare identifiers at the given argument positions into
    /// string literals.  Debugger commands use this for arguments
    /// such as format names, which must not be looked up.
    pub fn quote_arguments(&mut self, positions: &[usize]) {
        let mut node = self;
        let mut position = 0;
        loop {
            match node {
                Expression::Binary {
                    op: BinaryOperator::Comma,
                    left,
                    right,
                } => {
                    if positions.contains(&position) {
                        left.quote_if_identifier();
                    }
                    node = right.as_mut();
                    position += 1;
                }
                last => {
                    if positions.contains(&position) {
                        last.quote_if_identifier();
                    }
                    return;
                }
            }
        }
    }

    fn fmt_operand(&self, f: &mut Formatter<'_>, parenthesize: bool) -> fmt::Result {
        if parenthesize {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn write_quoted(f: &mut Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\u{8}' => f.write_str("\\b")?,
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            other => f.write_char(other)?,
        }
    }
    f.write_char('"')
}

/// Formats the expression as it would be written in a listing, with
/// only the parentheses the precedence rules require.
impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(name) => f.write_str(name),
            Expression::LiteralDigits(digits) => f.write_str(digits),
            Expression::LiteralString(s) => write_quoted(f, s),
            Expression::Unary { op, operand } => {
                f.write_str(op.symbol())?;
                let is_radix = matches!(op, UnaryOperator::OctalPrefix | UnaryOperator::HexPrefix);
                if is_radix && !matches!(operand.as_ref(), Expression::LiteralDigits(_)) {
                    // Keep the prefix from gluing itself to a name.
                    f.write_char(' ')?;
                }
                operand.fmt_operand(f, operand.precedence() < precedence::UNARY)
            }
            Expression::Binary {
                op: BinaryOperator::Apply,
                left,
                right,
            } => {
                left.fmt_operand(f, left.precedence() < precedence::ATOM)?;
                write!(f, "({right})")
            }
            Expression::Binary { op, left, right } => {
                let mine = op.precedence();
                let (left_parens, right_parens) = if op.is_right_associative() {
                    (left.precedence() <= mine, right.precedence() < mine)
                } else {
                    (left.precedence() < mine, right.precedence() <= mine)
                };
                left.fmt_operand(f, left_parens)?;
                match op {
                    BinaryOperator::Dot => f.write_char('.')?,
                    BinaryOperator::Comma => f.write_str(", ")?,
                    other => write!(f, " {} ", other.symbol())?,
                }
                right.fmt_operand(f, right_parens)
            }
        }
    }
}

//! Evaluation of expression trees against an [`Environment`].
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::symtab::Environment;
use crate::value::EvaluatedValue;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    UndefinedSymbol(String),
    NonIntegerOperand {
        operator: &'static str,
        found: &'static str,
    },
    BadDigit {
        digits: String,
        radix: u32,
    },
    ImproperlyFormattedNumber(String),
    FractionTooLarge(String),
    BadQualifiedName(String),
    DivisionByZero,
    Overflow,
    NotEvaluable(&'static str),
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UndefinedSymbol(name) => write!(f, "Undefined symbol {name}"),
            EvalError::NonIntegerOperand { operator, found } => write!(
                f,
                "Only integers are allowed in arithmetic operations, but '{operator}' was applied to {found}"
            ),
            EvalError::BadDigit { digits, radix: 8 } => {
                write!(f, "Digit string {digits} must be octal")
            }
            EvalError::BadDigit { digits, radix: 16 } => {
                write!(f, "Digit string {digits} must be hexadecimal")
            }
            EvalError::BadDigit { digits, radix } => {
                write!(f, "Digit string {digits} is not valid in base {radix}")
            }
            EvalError::ImproperlyFormattedNumber(s) => {
                write!(f, "Improperly formatted number {s}")
            }
            EvalError::FractionTooLarge(s) => {
                write!(f, "Fraction {s} is not less than 1")
            }
            EvalError::BadQualifiedName(s) => write!(f, "{s} is not a qualified name"),
            EvalError::DivisionByZero => f.write_str("Division by zero"),
            EvalError::Overflow => f.write_str("Arithmetic overflow"),
            EvalError::NotEvaluable(what) => write!(f, "{what} cannot be evaluated"),
        }
    }
}

impl Error for EvalError {}

pub trait Evaluate {
    /// # Errors
    ///
    /// Fails on type mismatches, malformed numbers and arithmetic
    /// errors.  An unresolved name is not in itself an error; it
    /// evaluates to [`EvaluatedValue::Undefined`].
    fn evaluate(&self, env: &Environment) -> Result<EvaluatedValue, EvalError>;
}

fn parse_digits(digits: &str, radix: u32) -> Result<i64, EvalError> {
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
        return Err(EvalError::BadDigit {
            digits: digits.to_string(),
            radix,
        });
    }
    i64::from_str_radix(digits, radix).map_err(|_| EvalError::Overflow)
}

/// Converts the text of a digit string.  Assembly source only ever
/// produces plain decimal digits here, but debugger number-strings
/// may also carry a sign and a radix prefix.  `-0` is negative zero.
fn parse_number_string(raw: &str) -> Result<EvaluatedValue, EvalError> {
    let (negative, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let magnitude = if let Some(octal) = unsigned.strip_prefix("0o") {
        parse_digits(octal, 8)?
    } else if let Some(hex) = unsigned.strip_prefix("0x") {
        parse_digits(hex, 16)?
    } else if !unsigned.is_empty() && unsigned.chars().all(|ch| ch.is_ascii_digit()) {
        parse_digits(unsigned, 10)?
    } else {
        return Err(EvalError::ImproperlyFormattedNumber(raw.to_string()));
    };
    Ok(match (negative, magnitude) {
        (true, 0) => EvaluatedValue::NegativeZero,
        (true, m) => EvaluatedValue::integer(-m),
        (false, m) => EvaluatedValue::integer(m),
    })
}

fn require_integer(op: BinaryOperator, value: EvaluatedValue) -> Result<i64, EvalError> {
    match value {
        EvaluatedValue::Integer { value, .. } => Ok(value),
        EvaluatedValue::NegativeZero => Ok(0),
        EvaluatedValue::Undefined(name) => Err(EvalError::UndefinedSymbol(name)),
        other => Err(EvalError::NonIntegerOperand {
            operator: op.symbol(),
            found: other.type_name(),
        }),
    }
}

fn floor_divide(a: i64, b: i64) -> Result<i64, EvalError> {
    if b == 0 {
        return Err(EvalError::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(EvalError::Overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn evaluate_arithmetic(
    op: BinaryOperator,
    left: &Expression,
    right: &Expression,
    env: &Environment,
    combine: fn(i64, i64) -> Result<i64, EvalError>,
) -> Result<EvaluatedValue, EvalError> {
    let a = require_integer(op, left.evaluate(env)?)?;
    let b = require_integer(op, right.evaluate(env)?)?;
    combine(a, b).map(EvaluatedValue::integer)
}

fn evaluate_unary(
    op: UnaryOperator,
    operand: &Expression,
    env: &Environment,
) -> Result<EvaluatedValue, EvalError> {
    match op {
        UnaryOperator::OctalPrefix | UnaryOperator::HexPrefix => {
            let radix = if op == UnaryOperator::OctalPrefix { 8 } else { 16 };
            match operand {
                Expression::LiteralDigits(digits) => {
                    parse_digits(digits, radix).map(EvaluatedValue::integer)
                }
                other => Err(EvalError::ImproperlyFormattedNumber(
                    Expression::unary(op, other.clone()).to_string(),
                )),
            }
        }
        UnaryOperator::Plus => operand.evaluate(env),
        UnaryOperator::Minus => match operand.evaluate(env)? {
            EvaluatedValue::Integer { value: 0, .. } => Ok(EvaluatedValue::NegativeZero),
            EvaluatedValue::Integer { value, .. } => value
                .checked_neg()
                .map(EvaluatedValue::integer)
                .ok_or(EvalError::Overflow),
            EvaluatedValue::NegativeZero => Ok(EvaluatedValue::integer(0)),
            EvaluatedValue::FloatingPoint(x) => Ok(EvaluatedValue::FloatingPoint(-x)),
            EvaluatedValue::Undefined(name) => Err(EvalError::UndefinedSymbol(name)),
            other => Err(EvalError::NonIntegerOperand {
                operator: "-",
                found: other.type_name(),
            }),
        },
    }
}

fn is_zero_or_one(digits: &str) -> bool {
    digits == "0" || digits == "1"
}

/// `±0.ddd` and `±1.ddd`.
fn fraction(sign: UnaryOperator, whole: &str, digits: &str) -> Result<EvaluatedValue, EvalError> {
    let text = format!("{whole}.{digits}");
    if !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(EvalError::ImproperlyFormattedNumber(text));
    }
    let magnitude: f64 = text
        .parse()
        .map_err(|_| EvalError::ImproperlyFormattedNumber(text.clone()))?;
    if magnitude >= 1.0 {
        return Err(EvalError::FractionTooLarge(text));
    }
    Ok(EvaluatedValue::FloatingPoint(if sign == UnaryOperator::Minus {
        -magnitude
    } else {
        magnitude
    }))
}

fn qualified_name(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Identifier(name) | Expression::LiteralDigits(name) => Some(name.clone()),
        Expression::Binary {
            op: BinaryOperator::Dot,
            left,
            right,
        } => Some(format!("{}.{}", qualified_name(left)?, qualified_name(right)?)),
        _ => None,
    }
}

fn evaluate_dot(left: &Expression, right: &Expression) -> Result<EvaluatedValue, EvalError> {
    if let (
        Expression::Unary {
            op: sign @ (UnaryOperator::Plus | UnaryOperator::Minus),
            operand,
        },
        Expression::LiteralDigits(digits),
    ) = (left, right)
    {
        if let Expression::LiteralDigits(whole) = operand.as_ref() {
            if is_zero_or_one(whole) {
                return fraction(*sign, whole, digits);
            }
        }
    }
    if let (Expression::LiteralDigits(high), Expression::LiteralDigits(low)) = (left, right) {
        if is_zero_or_one(high) && low.chars().count() == 5 {
            // A whole 16-bit word written in octal, e.g. 1.77777.
            return parse_digits(&format!("{high}{low}"), 8).map(EvaluatedValue::integer);
        }
    }
    match (qualified_name(left), qualified_name(right)) {
        (Some(l), Some(r)) => Ok(EvaluatedValue::String(format!("{l}.{r}"))),
        _ => Err(EvalError::BadQualifiedName(
            Expression::binary(BinaryOperator::Dot, left.clone(), right.clone()).to_string(),
        )),
    }
}

impl Evaluate for Expression {
    fn evaluate(&self, env: &Environment) -> Result<EvaluatedValue, EvalError> {
        match self {
            Expression::LiteralDigits(raw) => parse_number_string(raw),
            Expression::LiteralString(s) => Ok(EvaluatedValue::String(s.clone())),
            Expression::Identifier(name) => Ok(env.lookup(name)),
            Expression::Unary { op, operand } => evaluate_unary(*op, operand, env),
            Expression::Binary { op, left, right } => match op {
                BinaryOperator::Plus => evaluate_arithmetic(*op, left, right, env, |a, b| {
                    a.checked_add(b).ok_or(EvalError::Overflow)
                }),
                BinaryOperator::Minus => evaluate_arithmetic(*op, left, right, env, |a, b| {
                    a.checked_sub(b).ok_or(EvalError::Overflow)
                }),
                BinaryOperator::Multiply => evaluate_arithmetic(*op, left, right, env, |a, b| {
                    a.checked_mul(b).ok_or(EvalError::Overflow)
                }),
                BinaryOperator::Divide => evaluate_arithmetic(*op, left, right, env, floor_divide),
                BinaryOperator::BitAnd => {
                    evaluate_arithmetic(*op, left, right, env, |a, b| Ok(a & b))
                }
                BinaryOperator::BitOr => {
                    evaluate_arithmetic(*op, left, right, env, |a, b| Ok(a | b))
                }
                BinaryOperator::Dot => evaluate_dot(left, right),
                BinaryOperator::Comma => self
                    .arguments()
                    .into_iter()
                    .map(|item| item.evaluate(env))
                    .collect::<Result<Vec<_>, _>>()
                    .map(EvaluatedValue::List),
                BinaryOperator::Assign => Err(EvalError::NotEvaluable("Assignment")),
                BinaryOperator::Apply => Err(EvalError::NotEvaluable("Function application")),
            },
        }
    }
}

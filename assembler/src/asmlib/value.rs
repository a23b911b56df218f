use std::fmt::{self, Display, Formatter};

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatedValue {
    /// `is_address` is set only when the value came from looking a
    /// bare name up in the symbol table, which tells the debugger to
    /// show the memory contents at that address.
    Integer { value: i64, is_address: bool },
    /// The machine uses one's complement arithmetic, so `-0` is a
    /// value in its own right.  Arithmetic treats it as zero.
    NegativeZero,
    FloatingPoint(f64),
    String(String),
    List(Vec<EvaluatedValue>),
    /// A name which could not be resolved.
    Undefined(String),
}

impl EvaluatedValue {
    #[must_use]
    pub fn integer(value: i64) -> EvaluatedValue {
        EvaluatedValue::Integer {
            value,
            is_address: false,
        }
    }

    #[must_use]
    pub fn address(value: i64) -> EvaluatedValue {
        EvaluatedValue::Integer {
            value,
            is_address: true,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            EvaluatedValue::Integer { value, .. } => Some(*value),
            EvaluatedValue::NegativeZero => Some(0),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_address(&self) -> bool {
        matches!(
            self,
            EvaluatedValue::Integer {
                is_address: true,
                ..
            }
        )
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            EvaluatedValue::Integer { .. } => "Integer",
            EvaluatedValue::NegativeZero => "NegativeZero",
            EvaluatedValue::FloatingPoint(_) => "FloatingPoint",
            EvaluatedValue::String(_) => "String",
            EvaluatedValue::List(_) => "List",
            EvaluatedValue::Undefined(_) => "Undefined",
        }
    }
}

impl Display for EvaluatedValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvaluatedValue::Integer {
                value,
                is_address: false,
            } => write!(f, "Integer {value}"),
            EvaluatedValue::Integer {
                value,
                is_address: true,
            } => write!(f, "Integer {value} (address)"),
            EvaluatedValue::NegativeZero => f.write_str("NegativeZero"),
            EvaluatedValue::FloatingPoint(x) => write!(f, "FloatingPoint {x}"),
            EvaluatedValue::String(s) => write!(f, "String {s:?}"),
            EvaluatedValue::List(items) => {
                f.write_str("List [")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            EvaluatedValue::Undefined(name) => write!(f, "Undefined {name}"),
        }
    }
}

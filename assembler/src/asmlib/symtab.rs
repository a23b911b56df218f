//! Name resolution for the evaluator.
//!
//! Names resolve either to a value in the symbol table, which is
//! fixed once defined, or to a live value fetched through a
//! [`RegisterAccessor`] on every lookup.
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing::{Level, event};

use crate::value::EvaluatedValue;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    Redefinition {
        name: String,
        existing: i64,
        proposed: i64,
    },
}

impl Display for SymbolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SymbolError::Redefinition {
                name,
                existing,
                proposed,
            } => write!(
                f,
                "symbol {name} is already defined as {existing:#o}, cannot redefine it as {proposed:#o}"
            ),
        }
    }
}

impl Error for SymbolError {}

/// An append-only mapping from names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    definitions: BTreeMap<String, i64>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Defines `name`.  Defining a name again with the same value is
    /// harmless.
    ///
    /// # Errors
    ///
    /// Fails if `name` already has a different value.
    pub fn define(&mut self, name: &str, value: i64) -> Result<(), SymbolError> {
        match self.definitions.get(name) {
            Some(&existing) if existing != value => Err(SymbolError::Redefinition {
                name: name.to_string(),
                existing,
                proposed: value,
            }),
            Some(_) => Ok(()),
            None => {
                self.definitions.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.definitions.get(name).copied()
    }

    /// Returns the names whose value is `value`, in name order.
    pub fn names_for(&self, value: i64) -> impl Iterator<Item = &str> {
        self.definitions
            .iter()
            .filter(move |(_, v)| **v == value)
            .map(|(name, _)| name.as_str())
    }
}

/// Fetches the current value of a machine register.
pub trait RegisterAccessor {
    fn read_register(&self, name: &str) -> Option<i64>;
}

impl<F> RegisterAccessor for F
where
    F: Fn(&str) -> Option<i64>,
{
    fn read_register(&self, name: &str) -> Option<i64> {
        self(name)
    }
}

/// Read-only view through which the evaluator resolves names.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    symbols: &'a SymbolTable,
    registers: Option<&'a dyn RegisterAccessor>,
}

impl<'a> Environment<'a> {
    #[must_use]
    pub fn new(symbols: &'a SymbolTable) -> Environment<'a> {
        Environment {
            symbols,
            registers: None,
        }
    }

    #[must_use]
    pub fn with_registers(self, registers: &'a dyn RegisterAccessor) -> Environment<'a> {
        Environment {
            registers: Some(registers),
            ..self
        }
    }

    /// Registers take precedence over the symbol table, so that a
    /// register name always shows live state.
    #[must_use]
    pub fn lookup(&self, name: &str) -> EvaluatedValue {
        if let Some(value) = self.registers.and_then(|r| r.read_register(name)) {
            return EvaluatedValue::integer(value);
        }
        match self.symbols.get(name) {
            Some(value) => EvaluatedValue::address(value),
            None => {
                event!(Level::DEBUG, "symbol {name} is not defined");
                EvaluatedValue::Undefined(name.to_string())
            }
        }
    }
}

//! The interactive debugger's command layer.
//!
//! Each command line is parsed with [`Grammar::Debugger`], looked up
//! in a fixed command table and evaluated against the symbol table
//! and the live machine, which is reached only through
//! [`DebugTarget`].
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io::{self, BufRead, Write};

use base::prelude::*;
use tracing::{Level, event, span};

use crate::ast::Expression;
use crate::eval::{EvalError, Evaluate};
use crate::grammar::Grammar;
use crate::line::parse_line;
use crate::symtab::{Environment, SymbolTable};
use crate::types::SyntaxError;
use crate::value::EvaluatedValue;

#[cfg(test)]
mod tests;

/// The debugger's view of the machine being debugged.
pub trait DebugTarget {
    /// Returns `None` if `name` is not a register.
    fn read_register(&self, name: &str) -> Option<i64>;

    fn read_memory(&self, address: Address) -> Option<Word>;

    /// Disassembles the word at `address`.
    fn disassemble(&self, address: Address) -> String;

    /// The line shown when the debugger stops at `address`.
    fn source_line(&self, address: Address) -> String {
        format!("{address:o}: {}", self.disassemble(address))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Print,
    PrintBlock,
    Run,
    Step,
    Restart,
    SetBreakpoints,
    DeleteBreakpoints,
    ListBreakpoints,
    Help,
    Quit,
}

struct CommandInfo {
    names: &'static [&'static str],
    command: Command,
    help: &'static str,
    /// Argument positions (counting from zero) at which a bare name
    /// is taken literally instead of being looked up.
    literal_positions: &'static [usize],
}

const COMMANDS: [CommandInfo; 10] = [
    CommandInfo {
        names: &["p"],
        command: Command::Print,
        help: "p\t<expr> [, format]\twhere format = o: octal, d: decimal, fr: fraction, i: instruction\n\t\tprint an address and its contents, or just the value if a register is specified",
        literal_positions: &[1],
    },
    CommandInfo {
        names: &["pb"],
        command: Command::PrintBlock,
        help: "pb\t<addr>, <nwords> [, format]\n\t\tprint a block of <nwords> starting at <addr>",
        literal_positions: &[2],
    },
    CommandInfo {
        names: &["r"],
        command: Command::Run,
        help: "r\trun program from current pc",
        literal_positions: &[],
    },
    CommandInfo {
        names: &["s"],
        command: Command::Step,
        help: "s\tstep program one instruction",
        literal_positions: &[],
    },
    CommandInfo {
        names: &["rs"],
        command: Command::Restart,
        help: "rs\trestart program",
        literal_positions: &[],
    },
    CommandInfo {
        names: &["b"],
        command: Command::SetBreakpoints,
        help: "b\t<addr>1,...,<addr>N\n\t\tdefine a breakpoint for each given address. Prints breakpoint id and corresponding address",
        literal_positions: &[],
    },
    CommandInfo {
        names: &["bd"],
        command: Command::DeleteBreakpoints,
        help: "bd\t<bkptid>1,...,<bkptid>N\n\t\tdelete breakpoint defined by each given id",
        literal_positions: &[],
    },
    CommandInfo {
        names: &["bl"],
        command: Command::ListBreakpoints,
        help: "bl\tlist breakpoints",
        literal_positions: &[],
    },
    CommandInfo {
        names: &["h", "help"],
        command: Command::Help,
        help: "h\tprint help",
        literal_positions: &[],
    },
    // Only the long form, since a stray `q` is easy to type.
    CommandInfo {
        names: &["quit"],
        command: Command::Quit,
        help: "quit\texit debugger and simulator",
        literal_positions: &[],
    },
];

fn find_command(name: &str) -> Option<&'static CommandInfo> {
    COMMANDS.iter().find(|info| info.names.contains(&name))
}

impl Command {
    /// Looks up a command by the name typed at the prompt.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Command> {
        find_command(name).map(|info| info.command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Running,
    Stepping,
    Restarting,
    Stopped,
}

/// What the caller should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Prompt for another command.
    Stay,
    /// Let the program continue, in the way given by
    /// [`Debugger::state`].
    Leave,
    Quit,
}

/// How the program should carry on after the debugger prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumption {
    Continue,
    Restart,
    Quit,
}

#[derive(Debug)]
pub enum DebuggerError {
    Syntax(SyntaxError),
    Eval(EvalError),
    BadArguments(String),
    AddressOutOfRange(i64),
    Io(io::Error),
}

impl Display for DebuggerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DebuggerError::Syntax(e) => write!(f, "{}", e.kind),
            DebuggerError::Eval(e) => write!(f, "{e}"),
            DebuggerError::BadArguments(msg) => f.write_str(msg),
            DebuggerError::AddressOutOfRange(n) => {
                write!(f, "address {n:#o} is outside memory")
            }
            DebuggerError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl Error for DebuggerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DebuggerError::Syntax(e) => Some(e),
            DebuggerError::Eval(e) => Some(e),
            DebuggerError::Io(e) => Some(e),
            DebuggerError::BadArguments(_) | DebuggerError::AddressOutOfRange(_) => None,
        }
    }
}

impl From<SyntaxError> for DebuggerError {
    fn from(e: SyntaxError) -> DebuggerError {
        DebuggerError::Syntax(e)
    }
}

impl From<EvalError> for DebuggerError {
    fn from(e: EvalError) -> DebuggerError {
        DebuggerError::Eval(e)
    }
}

impl From<io::Error> for DebuggerError {
    fn from(e: io::Error) -> DebuggerError {
        DebuggerError::Io(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayFormat {
    Octal,
    Decimal,
    Fraction,
    Instruction,
}

impl DisplayFormat {
    fn from_value(value: Option<&EvaluatedValue>) -> Result<DisplayFormat, DebuggerError> {
        match value {
            None => Ok(DisplayFormat::Octal),
            Some(EvaluatedValue::String(s)) => match s.as_str() {
                "o" => Ok(DisplayFormat::Octal),
                "d" => Ok(DisplayFormat::Decimal),
                "fr" => Ok(DisplayFormat::Fraction),
                "i" => Ok(DisplayFormat::Instruction),
                other => Err(DebuggerError::BadArguments(format!(
                    "unknown format {other}"
                ))),
            },
            Some(other) => Err(DebuggerError::BadArguments(format!(
                "a format must be a name, not {}",
                other.type_name()
            ))),
        }
    }
}

fn signed_octal(n: i64) -> String {
    if n < 0 {
        format!("-{:o}", n.unsigned_abs())
    } else {
        format!("{n:o}")
    }
}

/// Shows an address as `0o100` (or `0d64`), followed by the
/// expression which produced it, if any.
fn format_address(address: i64, format: DisplayFormat, expr: Option<&Expression>) -> String {
    let mut result = match format {
        DisplayFormat::Decimal => format!("0d{address}"),
        _ => format!("0o{}", signed_octal(address)),
    };
    if let Some(expr) = expr {
        result.push_str(&format!("({expr})"));
    }
    result
}

fn format_word(word: Word, format: DisplayFormat) -> String {
    match format {
        DisplayFormat::Decimal if word.is_negative_zero() => "-0".to_string(),
        DisplayFormat::Decimal => word.to_signed().to_string(),
        DisplayFormat::Fraction => word.to_fraction().to_string(),
        DisplayFormat::Octal | DisplayFormat::Instruction => format!("0o{:06o}", word.bits()),
    }
}

fn format_memory<T: DebugTarget + ?Sized>(
    target: &T,
    address: i64,
    format: DisplayFormat,
) -> String {
    let Ok(address) = Address::try_from(address) else {
        return "<addr-out-of-range>".to_string();
    };
    if format == DisplayFormat::Instruction {
        return target.disassemble(address);
    }
    match target.read_memory(address) {
        Some(word) => format_word(word, format),
        None => "<addr-out-of-range>".to_string(),
    }
}

fn expect_integer(value: &EvaluatedValue, what: &str) -> Result<i64, DebuggerError> {
    match value {
        EvaluatedValue::Undefined(name) => Err(EvalError::UndefinedSymbol(name.clone()).into()),
        other => other.as_integer().ok_or_else(|| {
            DebuggerError::BadArguments(format!(
                "{what} must be an integer, not {}",
                other.type_name()
            ))
        }),
    }
}

/// Breakpoint ids are handed out in order and never reused.  Each id
/// names exactly one address and each address has at most one id.
#[derive(Debug, Default)]
struct Breakpoints {
    next_id: u32,
    by_id: BTreeMap<u32, Address>,
    by_address: BTreeMap<Address, u32>,
}

impl Breakpoints {
    /// Returns the id of the breakpoint at `address`, creating it if
    /// needed.
    fn add(&mut self, address: Address) -> u32 {
        if let Some(&id) = self.by_address.get(&address) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.by_id.insert(id, address);
        self.by_address.insert(address, id);
        id
    }

    fn remove(&mut self, id: u32) -> Option<Address> {
        let address = self.by_id.remove(&id)?;
        self.by_address.remove(&address);
        Some(address)
    }

    fn contains(&self, address: Address) -> bool {
        self.by_address.contains_key(&address)
    }
}

#[derive(Debug)]
pub struct Debugger {
    symbols: SymbolTable,
    breakpoints: Breakpoints,
    state: ProgramState,
}

impl Debugger {
    #[must_use]
    pub fn new(symbols: SymbolTable) -> Debugger {
        Debugger {
            symbols,
            breakpoints: Breakpoints::default(),
            state: ProgramState::Stopped,
        }
    }

    /// Prepares for a fresh run of the program.  Breakpoints survive.
    pub fn reset(&mut self, symbols: SymbolTable) {
        self.symbols = symbols;
        self.state = ProgramState::Stopped;
    }

    #[must_use]
    pub fn state(&self) -> ProgramState {
        self.state
    }

    #[must_use]
    pub fn has_breakpoint(&self, address: Address) -> bool {
        self.breakpoints.contains(address)
    }

    /// Sets a breakpoint at `address` and returns its id.  Setting a
    /// breakpoint where there already is one returns the existing id.
    ///
    /// # Errors
    ///
    /// Fails if `address` is outside memory.
    pub fn add_breakpoint(&mut self, address: i64) -> Result<u32, DebuggerError> {
        let address =
            Address::try_from(address).map_err(|_| DebuggerError::AddressOutOfRange(address))?;
        Ok(self.breakpoints.add(address))
    }

    /// Deletes a breakpoint, returning its address.  Unknown ids are
    /// ignored.
    pub fn delete_breakpoint(&mut self, id: u32) -> Option<Address> {
        self.breakpoints.remove(id)
    }

    fn describe_breakpoint(&self, id: u32) -> Option<String> {
        let address = *self.breakpoints.by_id.get(&id)?;
        let symbol = self
            .symbols
            .names_for(i64::from(address))
            .next()
            .map(|name| format!("({name})"))
            .unwrap_or_default();
        Some(format!("{id} 0o{address:o}{symbol}"))
    }

    /// Runs one command line.
    ///
    /// # Errors
    ///
    /// Fails if the command is malformed, cannot be evaluated, or
    /// output cannot be written.  Unknown commands are reported on
    /// `out` and are not errors.
    pub fn execute_line<T, W>(
        &mut self,
        text: &str,
        target: &T,
        out: &mut W,
    ) -> Result<Control, DebuggerError>
    where
        T: DebugTarget + ?Sized,
        W: Write,
    {
        let line = parse_line(text, 0, Grammar::Debugger)?;
        if !line.has_instruction() {
            self.state = ProgramState::Stepping;
            return Ok(Control::Leave);
        }
        let Some(info) = find_command(&line.opcode) else {
            writeln!(out, "Unknown command")?;
            return Ok(Control::Stay);
        };
        event!(
            Level::DEBUG,
            "debugger command {:?} with operand {:?}",
            info.command,
            line.operand
        );
        let mut operand = line.operand;
        if let Some(operand) = operand.as_mut() {
            operand.quote_arguments(info.literal_positions);
        }

        self.state = ProgramState::Stopped;
        match info.command {
            Command::Print => self.print(operand.as_ref(), target, out)?,
            Command::PrintBlock => self.print_block(operand.as_ref(), target, out)?,
            Command::Run => self.state = ProgramState::Running,
            Command::Step => self.state = ProgramState::Stepping,
            Command::Restart => self.state = ProgramState::Restarting,
            Command::SetBreakpoints => self.set_breakpoints(operand.as_ref(), target, out)?,
            Command::DeleteBreakpoints => self.delete_breakpoints(operand.as_ref(), target)?,
            Command::ListBreakpoints => {
                for &id in self.breakpoints.by_id.keys() {
                    if let Some(description) = self.describe_breakpoint(id) {
                        writeln!(out, "{description}")?;
                    }
                }
            }
            Command::Help => {
                for info in &COMMANDS {
                    writeln!(out, "{}", info.help)?;
                }
            }
            Command::Quit => return Ok(Control::Quit),
        }
        Ok(match self.state {
            ProgramState::Stopped => Control::Stay,
            ProgramState::Running | ProgramState::Stepping | ProgramState::Restarting => {
                Control::Leave
            }
        })
    }

    /// Evaluates the command's arguments.  A missing operand yields
    /// no values.
    fn evaluate_arguments<T>(
        &self,
        operand: Option<&Expression>,
        target: &T,
    ) -> Result<Vec<EvaluatedValue>, DebuggerError>
    where
        T: DebugTarget + ?Sized,
    {
        let Some(operand) = operand else {
            return Ok(Vec::new());
        };
        let registers = |name: &str| target.read_register(name);
        let env = Environment::new(&self.symbols).with_registers(&registers);
        match operand.evaluate(&env)? {
            EvaluatedValue::List(values) => Ok(values),
            value => Ok(vec![value]),
        }
    }

    fn print<T, W>(
        &self,
        operand: Option<&Expression>,
        target: &T,
        out: &mut W,
    ) -> Result<(), DebuggerError>
    where
        T: DebugTarget + ?Sized,
        W: Write,
    {
        let values = self.evaluate_arguments(operand, target)?;
        let (value, format) = match values.as_slice() {
            [value] => (value, DisplayFormat::Octal),
            [value, format] => (value, DisplayFormat::from_value(Some(format))?),
            _ => {
                return Err(DebuggerError::BadArguments(
                    "p takes an expression and an optional format".to_string(),
                ));
            }
        };
        let n = expect_integer(value, "the value to print")?;
        let expr = operand.and_then(|e| e.arguments().first().copied());
        if value.is_address() {
            writeln!(
                out,
                "{} = {}",
                format_address(n, format, expr),
                format_memory(target, n, format)
            )?;
        } else {
            let shown = match format {
                DisplayFormat::Octal => signed_octal(n),
                DisplayFormat::Decimal => n.to_string(),
                DisplayFormat::Fraction => match Word::try_from(n) {
                    Ok(word) => word.to_fraction().to_string(),
                    Err(e) => return Err(DebuggerError::BadArguments(e.to_string())),
                },
                DisplayFormat::Instruction => {
                    return Err(DebuggerError::BadArguments(
                        "format i needs an address".to_string(),
                    ));
                }
            };
            match expr {
                Some(expr) => writeln!(out, "{expr} = {shown}")?,
                None => writeln!(out, "{shown}")?,
            }
        }
        Ok(())
    }

    fn print_block<T, W>(
        &self,
        operand: Option<&Expression>,
        target: &T,
        out: &mut W,
    ) -> Result<(), DebuggerError>
    where
        T: DebugTarget + ?Sized,
        W: Write,
    {
        let values = self.evaluate_arguments(operand, target)?;
        let (base, count, format) = match values.as_slice() {
            [base, count] => (base, count, None),
            [base, count, format] => (base, count, Some(format)),
            _ => {
                return Err(DebuggerError::BadArguments(
                    "pb takes an address, a word count and an optional format".to_string(),
                ));
            }
        };
        let base = expect_integer(base, "the block address")?;
        let count = expect_integer(count, "the word count")?;
        let format = DisplayFormat::from_value(format)?;
        let expr = operand.and_then(|e| e.arguments().first().copied());
        writeln!(out, "{}:", format_address(base, format, expr))?;
        for address in base..base.saturating_add(count) {
            writeln!(
                out,
                "  {} = {}",
                format_address(address, format, None),
                format_memory(target, address, format)
            )?;
            // Nothing follows the first word outside core.
            if Address::try_from(address).is_err() {
                break;
            }
        }
        Ok(())
    }

    fn set_breakpoints<T, W>(
        &mut self,
        operand: Option<&Expression>,
        target: &T,
        out: &mut W,
    ) -> Result<(), DebuggerError>
    where
        T: DebugTarget + ?Sized,
        W: Write,
    {
        let values = self.evaluate_arguments(operand, target)?;
        if values.is_empty() {
            return Err(DebuggerError::BadArguments(
                "b needs at least one address".to_string(),
            ));
        }
        for value in &values {
            let id = self.add_breakpoint(expect_integer(value, "a breakpoint address")?)?;
            if let Some(description) = self.describe_breakpoint(id) {
                writeln!(out, "{description}")?;
            }
        }
        Ok(())
    }

    fn delete_breakpoints<T>(
        &mut self,
        operand: Option<&Expression>,
        target: &T,
    ) -> Result<(), DebuggerError>
    where
        T: DebugTarget + ?Sized,
    {
        let values = self.evaluate_arguments(operand, target)?;
        if values.is_empty() {
            return Err(DebuggerError::BadArguments(
                "bd needs at least one breakpoint id".to_string(),
            ));
        }
        for value in &values {
            let id = expect_integer(value, "a breakpoint id")?;
            if let Ok(id) = u32::try_from(id) {
                if let Some(address) = self.delete_breakpoint(id) {
                    event!(Level::DEBUG, "deleted breakpoint {id} at {address:o}");
                }
            }
        }
        Ok(())
    }

    /// Called by the simulator before executing the instruction at
    /// `pc`.  Prompts for commands unless the program is running and
    /// `pc` carries no breakpoint.
    ///
    /// # Errors
    ///
    /// Fails only if the terminal cannot be read or written.  Errors
    /// in individual commands are reported on `out`.
    pub fn repl<T, R, W>(
        &mut self,
        pc: Address,
        target: &T,
        input: &mut R,
        out: &mut W,
    ) -> Result<Resumption, io::Error>
    where
        T: DebugTarget + ?Sized,
        R: BufRead,
        W: Write,
    {
        if self.state == ProgramState::Running && !self.has_breakpoint(pc) {
            return Ok(Resumption::Continue);
        }
        let span = span!(Level::DEBUG, "debugger prompt", pc = %pc);
        let _enter = span.enter();

        writeln!(out, "{}", target.source_line(pc))?;
        loop {
            write!(out, "dbg {pc:o}> ")?;
            out.flush()?;
            let mut text = String::new();
            if input.read_line(&mut text)? == 0 {
                return Ok(Resumption::Quit);
            }
            let text = text.trim_end_matches(['\r', '\n']);
            match self.execute_line(text, target, out) {
                Ok(Control::Stay) => (),
                Ok(Control::Leave) => break,
                Ok(Control::Quit) => return Ok(Resumption::Quit),
                Err(DebuggerError::Io(e)) => return Err(e),
                Err(DebuggerError::Syntax(e)) => write!(out, "{}", e.diagnostic())?,
                Err(e) => writeln!(out, "Error: {e}")?,
            }
        }
        if self.state == ProgramState::Restarting {
            self.state = ProgramState::Running;
            Ok(Resumption::Restart)
        } else {
            Ok(Resumption::Continue)
        }
    }
}

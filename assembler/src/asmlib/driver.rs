//! Whole-file driving loops for the command-line tools.
//!
//! Every line gets a parser of its own.  A failing line is reported
//! and skipped; the tools only give up when the error limit is
//! exceeded.
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{Level, event, span};

use crate::ast::Expression;
use crate::eval::{EvalError, Evaluate};
use crate::grammar::Grammar;
use crate::lexer::Tokenizer;
use crate::line::{LineParser, ParsedLine};
use crate::parser::ExpressionParser;
use crate::symtab::{Environment, SymbolTable};
use crate::tape::RebuiltSource;
use crate::types::{LineNumber, SyntaxError, ToolFailure};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub grammar: Grammar,
    /// Print each parsed line and the value of its operand.
    pub verbose: bool,
    /// Print each line back in canonical form.
    pub reformat: bool,
    /// Stop once more than this many lines have failed.
    pub max_errors: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> ParseOptions {
        ParseOptions {
            grammar: Grammar::Assembly,
            verbose: false,
            reformat: false,
            max_errors: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub lines: usize,
    pub instructions: usize,
    pub failures: usize,
}

fn open_input(input_file: &OsStr) -> Result<File, ToolFailure> {
    OpenOptions::new()
        .read(true)
        .open(input_file)
        .map_err(|e| ToolFailure::IoErrorOnInput {
            filename: input_file.to_owned(),
            error: e,
            line_number: None,
        })
}

/// Reads the whole of `input_file` as lines.
///
/// # Errors
///
/// Fails if the file cannot be opened or read.
pub fn read_source_lines(input_file: &OsStr) -> Result<Vec<String>, ToolFailure> {
    let input = open_input(input_file)?;
    let mut source_lines: Vec<String> = Vec::new();
    for (item, line_number) in BufReader::new(input).lines().zip(1..) {
        match item {
            Err(e) => {
                return Err(ToolFailure::IoErrorOnInput {
                    filename: input_file.to_owned(),
                    error: e,
                    line_number: Some(line_number),
                });
            }
            Ok(source_line) => source_lines.push(source_line),
        }
    }
    Ok(source_lines)
}

/// Parses each line with a fresh [`LineParser`].  Lines which fail
/// are left out of the result and their errors returned alongside.
#[must_use]
pub fn parse_lines(lines: &[String], grammar: Grammar) -> (Vec<ParsedLine>, Vec<SyntaxError>) {
    let mut parsed: Vec<ParsedLine> = Vec::with_capacity(lines.len());
    let mut errors: Vec<SyntaxError> = Vec::new();
    for (text, line_number) in lines.iter().zip(1..) {
        let mut parser = LineParser::new(text, line_number, grammar);
        match parser.parse_line() {
            Ok(_) => parsed.push(parser.into_parsed_line()),
            Err(e) => {
                event!(Level::DEBUG, "line {line_number} failed: {e}");
                errors.push(e);
            }
        }
    }
    (parsed, errors)
}

/// Formats an evaluation failure together with the line it happened on.
#[must_use]
pub fn eval_error_report(error: &EvalError, line_text: &str) -> String {
    format!("{error}:\n{line_text}\n")
}

/// Prefixes a per-line message with its line number.
#[must_use]
pub fn line_report(line_number: LineNumber, message: &str) -> String {
    format!("Line {line_number}: {message}")
}

fn stdout_failure(error: io::Error) -> ToolFailure {
    ToolFailure::IoErrorOnStdout { error }
}

struct Reporter<'w, W> {
    out: &'w mut W,
    options: ParseOptions,
    summary: ParseSummary,
    symbols: SymbolTable,
}

impl<W: Write> Reporter<'_, W> {
    fn fail(&mut self, report: &str) -> Result<(), ToolFailure> {
        self.summary.failures += 1;
        write!(self.out, "{report}").map_err(stdout_failure)?;
        match self.options.max_errors {
            Some(limit) if self.summary.failures > limit => {
                Err(ToolFailure::TooManyErrors(self.summary.failures))
            }
            _ => Ok(()),
        }
    }

    fn show_value(&mut self, operand: &Expression, line_text: &str) -> Result<(), ToolFailure> {
        let env = Environment::new(&self.symbols);
        match operand.evaluate(&env) {
            Ok(value) => writeln!(self.out, "    {operand} => {value}").map_err(stdout_failure),
            Err(e) => self.fail(&eval_error_report(&e, line_text)),
        }
    }

    fn line(&mut self, text: &str, line_number: LineNumber) -> Result<(), ToolFailure> {
        self.summary.lines += 1;
        let mut parser = LineParser::new(text, line_number, self.options.grammar);
        let has_instruction = match parser.parse_line() {
            Ok(b) => b,
            Err(e) => {
                return self.fail(&line_report(line_number, &e.diagnostic()));
            }
        };
        let line = parser.into_parsed_line();
        if has_instruction {
            self.summary.instructions += 1;
        }
        if self.options.verbose {
            writeln!(self.out, "{}", line_report(line_number, &format!("{line:?}")))
                .map_err(stdout_failure)?;
            if let Some(operand) = &line.operand {
                self.show_value(operand, &line.raw_text)?;
            }
        }
        if self.options.reformat {
            writeln!(self.out, "{line}").map_err(stdout_failure)?;
        }
        Ok(())
    }

    fn statements<R: BufRead>(&mut self, input: R) -> Result<(), ToolFailure> {
        let mut parser = ExpressionParser::new(Tokenizer::new(input, Grammar::Expression));
        let statements = match parser.parse_statements() {
            Ok(statements) => statements,
            Err(e) => {
                return self.fail(&line_report(e.location.line, &e.diagnostic()));
            }
        };
        for statement in &statements {
            self.summary.instructions += 1;
            if self.options.verbose {
                writeln!(self.out, "{statement:?}").map_err(stdout_failure)?;
                self.show_value(statement, &statement.to_string())?;
            }
            if self.options.reformat {
                writeln!(self.out, "{statement};").map_err(stdout_failure)?;
            }
        }
        Ok(())
    }
}

/// Parses every line of `input_file`, writing diagnostics (and, as
/// the options ask, listings) on `out`.
///
/// # Errors
///
/// Fails if the file cannot be read, if any line fails, or if the
/// error limit is exceeded.
pub fn parse_file<W: Write>(
    input_file: &OsStr,
    options: ParseOptions,
    out: &mut W,
) -> Result<ParseSummary, ToolFailure> {
    let span = span!(Level::INFO, "parse", input=?input_file, grammar=?options.grammar);
    let _enter = span.enter();

    let mut reporter = Reporter {
        out,
        options,
        summary: ParseSummary::default(),
        symbols: SymbolTable::new(),
    };
    if options.grammar == Grammar::Expression {
        // Statements may run across lines, so the whole stream goes
        // through one parser.
        reporter.statements(BufReader::new(open_input(input_file)?))?;
    } else {
        for (text, line_number) in read_source_lines(input_file)?.iter().zip(1..) {
            reporter.line(text, line_number)?;
        }
    }
    let summary = reporter.summary;
    event!(
        Level::INFO,
        "{} lines, {} instructions, {} failures",
        summary.lines,
        summary.instructions,
        summary.failures
    );
    if summary.failures > 0 {
        Err(ToolFailure::LinesFailed(summary.failures))
    } else {
        Ok(summary)
    }
}

/// The name `wwlz` writes to if no output file is given.
#[must_use]
pub fn default_output_name(input_file: &Path) -> PathBuf {
    input_file.with_extension("ww")
}

/// Where rebuilt source goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// `-` means standard output.
    #[must_use]
    pub fn from_name(name: &OsStr) -> OutputTarget {
        if name == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::File(PathBuf::from(name))
        }
    }
}

/// Rebuilds assembly source from the tape listing in `input_file`.
/// Lines which cannot be parsed are reported on `diagnostics` and
/// left out of the output.
///
/// # Errors
///
/// Fails on I/O errors and if any line could not be parsed.
pub fn rebuild_tape_file<W: Write>(
    input_file: &OsStr,
    output: &OutputTarget,
    diagnostics: &mut W,
) -> Result<(), ToolFailure> {
    let span = span!(Level::INFO, "rebuild", input=?input_file, output=?output);
    let _enter = span.enter();

    let source_lines = read_source_lines(input_file)?;
    let (parsed, errors) = parse_lines(&source_lines, Grammar::Tape);
    for e in &errors {
        write!(diagnostics, "{}", line_report(e.location.line, &e.diagnostic()))
            .map_err(stdout_failure)?;
    }
    let source = RebuiltSource::from_lines(&parsed);
    match output {
        OutputTarget::Stdout => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            source.write_to(&mut handle).map_err(stdout_failure)?;
        }
        OutputTarget::File(path) => {
            let write_failure = |error| ToolFailure::IoErrorOnOutput {
                filename: path.clone(),
                error,
            };
            let mut file = File::create(path).map_err(write_failure)?;
            source.write_to(&mut file).map_err(write_failure)?;
            file.flush().map_err(write_failure)?;
        }
    }
    event!(
        Level::INFO,
        "rebuilt {} lines, {} had errors",
        source_lines.len(),
        errors.len()
    );
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ToolFailure::LinesFailed(errors.len()))
    }
}

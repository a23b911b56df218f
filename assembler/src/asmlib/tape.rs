//! Rebuilding assembly source from tape listings.
//!
//! A tape listing gives each word an offset within a named section,
//! and refers to other words of the same section as `<n>r`.  The
//! rebuilt source labels each referenced word `<offset><section>`
//! and rewrites the references to match.
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{Level, event};

use crate::ast::Expression;
use crate::line::ParsedLine;

#[cfg(test)]
mod tests;

const SECTION_OPCODE: &str = "section";

/// Width of the label field, including the colon and the space after it.
const LABEL_FIELD_WIDTH: usize = 10;

/// Comments start this many columns after the opcode.
const COMMENT_COLUMN: usize = 20;

fn relative_label_regex() -> &'static Regex {
    static RELATIVE_LABEL: OnceLock<Regex> = OnceLock::new();
    RELATIVE_LABEL.get_or_init(|| match Regex::new("^(?<offset>[0-9]+)r$") {
        Ok(r) => r,
        Err(e) => panic!("relative label pattern is not a valid regular expression: {e}"),
    })
}

/// Turns a section-relative reference such as `12r` into the label
/// of the word it refers to.  Other names are unchanged.
#[must_use]
pub fn absolute_label(section: &str, name: &str) -> String {
    match relative_label_regex().captures(name) {
        Some(captures) => format!("{}{section}", &captures["offset"]),
        None => name.to_string(),
    }
}

/// Maps tape-listing opcodes onto the names the assembler uses.
#[must_use]
pub fn resolve_opcode(opcode: &str) -> &str {
    match opcode {
        "sl" => "slr",
        "sr" => "srr",
        "p" => ".word",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceLine {
    Section(String),
    Instruction {
        label: String,
        opcode: String,
        operand: String,
        comment: String,
    },
    Comment(String),
}

/// Assembly source rebuilt from the lines of a tape listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuiltSource {
    lines: Vec<SourceLine>,
    referenced: BTreeSet<String>,
}

impl RebuiltSource {
    #[must_use]
    pub fn from_lines(parsed: &[ParsedLine]) -> RebuiltSource {
        let mut result = RebuiltSource::default();
        let mut section = String::new();
        for line in parsed {
            if line.opcode == SECTION_OPCODE {
                section = line
                    .operand
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                event!(
                    Level::DEBUG,
                    "line {}: starting section '{section}'",
                    line.line_number
                );
                result.lines.push(SourceLine::Section(section.clone()));
            } else if line.has_instruction() {
                let operand = match &line.operand {
                    Some(Expression::Identifier(name)) => {
                        let target = absolute_label(&section, name);
                        result.referenced.insert(target.clone());
                        target
                    }
                    Some(operand) => operand.to_string(),
                    None => String::new(),
                };
                result.lines.push(SourceLine::Instruction {
                    label: format!("{}{section}", line.prefix_offset.unwrap_or(0)),
                    opcode: resolve_opcode(&line.opcode).to_string(),
                    operand,
                    comment: line.postfix_comment.clone(),
                });
            } else if !line.prefix_comment.is_empty() {
                result
                    .lines
                    .push(SourceLine::Comment(line.prefix_comment.clone()));
            }
        }
        result
    }

    /// Whether some instruction refers to `label`.
    #[must_use]
    pub fn is_referenced(&self, label: &str) -> bool {
        self.referenced.contains(label)
    }

    /// Writes the source out.  Only referenced labels are written.
    ///
    /// # Errors
    ///
    /// Fails if `out` cannot be written.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in &self.lines {
            match line {
                SourceLine::Section(name) => writeln!(out, "{name}:")?,
                SourceLine::Comment(text) => writeln!(out, "; {text}")?,
                SourceLine::Instruction {
                    label,
                    opcode,
                    operand,
                    comment,
                } => {
                    if self.is_referenced(label) {
                        let padding = LABEL_FIELD_WIDTH.saturating_sub(label.len() + 2);
                        write!(out, "{label}:{} ", " ".repeat(padding))?;
                    } else {
                        write!(out, "{}", " ".repeat(LABEL_FIELD_WIDTH))?;
                    }
                    if operand.is_empty() {
                        write!(out, "{opcode}")?;
                    } else {
                        write!(out, "{opcode} {operand}")?;
                    }
                    if !comment.is_empty() {
                        let padding = COMMENT_COLUMN.saturating_sub(opcode.len() + operand.len());
                        write!(out, "{}; {comment}", " ".repeat(padding))?;
                    }
                    writeln!(out)?;
                }
            }
        }
        Ok(())
    }
}

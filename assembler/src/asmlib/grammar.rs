//! The grammar variants share one tokenizer and one expression
//! parser but differ in which characters are operators and in how a
//! line is structured.

/// Selects the lexical and line-level rules in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    /// Whirlwind assembly source.
    Assembly,
    /// Tape listings, whose fields are separated by tabs.
    Tape,
    /// Free-standing expressions, `;`-separated, over a whole stream.
    Expression,
    /// Debugger commands: a command name and a comma-separated list
    /// of arguments.
    Debugger,
}

impl Grammar {
    pub(crate) fn is_operator(self, ch: char) -> bool {
        match self {
            Grammar::Assembly | Grammar::Tape => matches!(
                ch,
                '+' | '-' | ':' | '.' | ',' | '*' | '/' | '|' | '&' | '(' | ')'
            ),
            Grammar::Expression => matches!(
                ch,
                '+' | '-'
                    | '*'
                    | '/'
                    | '.'
                    | ','
                    | ';'
                    | '('
                    | ')'
                    | '{'
                    | '}'
                    | '['
                    | ']'
                    | '|'
                    | '&'
                    | '^'
                    | '<'
                    | '>'
                    | '='
            ),
            Grammar::Debugger => matches!(ch, ',' | '(' | ')'),
        }
    }

    /// Whether `;` begins a comment which runs to the end of the line.
    pub(crate) fn has_semicolon_comments(self) -> bool {
        matches!(self, Grammar::Assembly | Grammar::Tape)
    }

    /// Whether `@` is significant (auto-comments and the `@`
    /// operator).
    pub(crate) fn has_at_sign(self) -> bool {
        !matches!(self, Grammar::Debugger)
    }

    /// Whether a tab is a field separator rather than whitespace.
    pub(crate) fn tab_separates_records(self) -> bool {
        matches!(self, Grammar::Tape)
    }

    /// Whether runs of non-operator characters are taken whole as
    /// single tokens instead of being lexed as numbers and names.
    pub(crate) fn has_opaque_runs(self) -> bool {
        matches!(self, Grammar::Debugger)
    }
}

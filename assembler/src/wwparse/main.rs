use std::error::Error;
use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};
use std::io;

use clap::ArgAction::{Set, SetTrue};
use clap::{Parser, ValueEnum};
use tracing::{Level, event, span};
use tracing_subscriber::prelude::*;

use wwasm::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GrammarArg {
    Assembly,
    Tape,
    Expression,
    Debugger,
}

impl From<GrammarArg> for Grammar {
    fn from(arg: GrammarArg) -> Grammar {
        match arg {
            GrammarArg::Assembly => Grammar::Assembly,
            GrammarArg::Tape => Grammar::Tape,
            GrammarArg::Expression => Grammar::Expression,
            GrammarArg::Debugger => Grammar::Debugger,
        }
    }
}

/// Parser checker for Whirlwind assembly source, tape listings and
/// debugger scripts
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// File to parse.
    #[clap(action=Set)]
    input: OsString,

    /// Which grammar the input is written in.
    #[clap(action = Set, long, value_enum, default_value_t = GrammarArg::Assembly)]
    grammar: GrammarArg,

    /// Print each parsed line and the value of its operand.
    #[clap(action = SetTrue, short = 'v', long)]
    verbose: bool,

    /// Print each line back out in canonical form.
    #[clap(action = SetTrue, long)]
    reformat: bool,

    /// Give up once more than this many lines have failed.
    #[clap(action = Set, long)]
    max_errors: Option<usize>,
}

#[derive(Debug)]
enum Fail {
    ParseFail(ToolFailure),
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::ParseFail(failure) => failure.fmt(f),
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

fn run_parser() -> Result<(), Fail> {
    let cli = Cli::parse();

    // Set RUST_LOG to select which trace messages get printed; see
    // https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(io::stderr);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Fail::InitialisationFailure(format!(
                "failed to initialise tracing filter (perhaps there is a problem with environment variables): {e}"
            )));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let span = span!(Level::ERROR, "wwparse", input=?cli.input);
    let _enter = span.enter();
    let options = ParseOptions {
        grammar: cli.grammar.into(),
        verbose: cli.verbose,
        reformat: cli.reformat,
        max_errors: cli.max_errors,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match parse_file(&cli.input, options, &mut out) {
        Ok(summary) => {
            event!(
                Level::INFO,
                "parsed {} lines without errors",
                summary.lines
            );
            Ok(())
        }
        Err(e) => {
            event!(Level::ERROR, "parsing failed: {:?}", e);
            Err(Fail::ParseFail(e))
        }
    }
}

fn main() {
    unsafe { backtrace_on_stack_overflow::enable() };

    match run_parser() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

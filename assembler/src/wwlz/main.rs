use std::error::Error;
use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::Path;

use clap::ArgAction::Set;
use clap::Parser;
use tracing::{Level, event, span};
use tracing_subscriber::prelude::*;

use wwasm::driver::default_output_name;
use wwasm::*;

/// Rebuilds Whirlwind assembly source from a tape listing
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Tape listing to read.
    #[clap(action=Set)]
    input: OsString,

    /// File to write; "-" means standard output.  Defaults to the
    /// input file name with the extension changed to ".ww".
    #[clap(action = Set, short = 'o', long)]
    output: Option<OsString>,
}

#[derive(Debug)]
enum Fail {
    RebuildFail(ToolFailure),
    InitialisationFailure(String),
}

impl Display for Fail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Fail::RebuildFail(failure) => failure.fmt(f),
            Fail::InitialisationFailure(msg) => f.write_str(msg.as_str()),
        }
    }
}

impl Error for Fail {}

fn run_rebuild() -> Result<(), Fail> {
    let cli = Cli::parse();

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

    let output = match &cli.output {
        Some(name) => OutputTarget::from_name(name),
        None => OutputTarget::File(default_output_name(Path::new(&cli.input))),
    };
    let span = span!(Level::ERROR, "wwlz", input=?cli.input, output=?output);
    let _enter = span.enter();
    let stderr = io::stderr();
    let mut diagnostics = stderr.lock();
    let result =
        rebuild_tape_file(&cli.input, &output, &mut diagnostics).map_err(Fail::RebuildFail);
    if let Err(e) = &result {
        event!(Level::ERROR, "rebuild failed: {:?}", e);
    } else {
        event!(Level::INFO, "rebuild succeeded");
    }
    result
}

fn main() {
    unsafe { backtrace_on_stack_overflow::enable() };

    match run_rebuild() {
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Ok(()) => {
            std::process::exit(0);
        }
    }
}

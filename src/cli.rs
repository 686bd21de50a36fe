//! Pieces shared by both binaries: common args, logging and stdout handling.

use std::io::{self, Write};

use anyhow::Result;
use clap::{Arg, ArgAction};
use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn spec_arg(default: &'static str) -> Arg {
    Arg::new("spec")
        .long("spec")
        .value_name("FILE")
        .default_value(default)
        .help("Spec document to read")
}

pub fn path_arg() -> Arg {
    Arg::new("path").help("Endpoint path to inspect")
}

pub fn method_arg() -> Arg {
    Arg::new("method")
        .long("method")
        .value_name("VERB")
        .action(ArgAction::Set)
        .help("HTTP method to inspect for a given path")
}

/// Run `write` against a locked stdout. A closed pipe ends the process
/// quietly.
pub fn with_stdout<F>(write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let mut out = io::stdout().lock();
    match write(&mut out).and_then(|()| out.flush()) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => std::process::exit(0),
        result => Ok(result?),
    }
}

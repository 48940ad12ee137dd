//! Entry point for `cobalt-compute-ctl`.
//!
//! Delegates to [`cobalt_ctl::run`], which parses the verb, loads layered
//! configuration, and drives the daemon's lifecycle.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    cobalt_ctl::run(std::env::args_os(), &mut stdout, &mut stderr)
}

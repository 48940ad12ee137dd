//! Service controller for the cobalt-compute daemon.
//!
//! The runtime splits leading configuration flags from the verb, loads
//! layered configuration, derives the service descriptor, and dispatches the
//! verb onto the process backend. Configuration loading, the process backend,
//! and the output streams can all be substituted in tests.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use cobalt_config::ServiceDescriptor;

mod cli;
mod config;
mod errors;
mod lifecycle;
pub mod telemetry;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, prepare_cli_arguments, split_config_arguments};
use errors::AppError;
use lifecycle::{
    LifecycleOutput, ProcessLauncher, ProcessLocator, ProcessTerminator, ServiceController,
    SystemProcesses, USAGE_EXIT_CODE,
};

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, 'io, W: Write, E: Write, L: ConfigLoader, P> {
    io: &'a mut IoStreams<'io, W, E>,
    loader: &'a L,
    processes: &'a P,
}

impl<'a, 'io, W, E, L, P> CliRunner<'a, 'io, W, E, L, P>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
    P: ProcessLocator + ProcessLauncher + ProcessTerminator,
{
    fn new(io: &'a mut IoStreams<'io, W, E>, loader: &'a L, processes: &'a P) -> Self {
        Self {
            io,
            loader,
            processes,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        // The verb is validated before configuration is read so an invalid
        // invocation never touches the daemon.
        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) => return self.report_parse_error(&error),
        };

        match self.execute(&cli, &split.config_arguments) {
            Ok(exit_code) => exit_code,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::from(error.exit_code())
            }
        }
    }

    fn execute(&mut self, cli: &Cli, config_arguments: &[OsString]) -> Result<ExitCode, AppError> {
        let config = self.loader.load(config_arguments)?;
        telemetry::initialise(&config)?;
        let descriptor = ServiceDescriptor::from_config(&config)?;
        let controller = ServiceController::new(&descriptor, self.processes);
        let mut output = LifecycleOutput::new(&mut *self.io.stdout, &mut *self.io.stderr);
        let status = controller.dispatch(cli.verb, &mut output)?;
        Ok(ExitCode::from(status.exit_code()))
    }

    fn report_parse_error(&mut self, error: &clap::Error) -> ExitCode {
        match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = write!(self.io.stdout, "{error}");
                ExitCode::SUCCESS
            }
            _ => {
                let _ = write!(self.io.stderr, "{}", error.render());
                ExitCode::from(USAGE_EXIT_CODE)
            }
        }
    }
}

/// Runs the controller using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with(args, &mut io, &OrthoConfigLoader, &SystemProcesses)
}

/// Runs the controller with a substituted configuration loader and process
/// backend.
#[must_use]
pub(crate) fn run_with<I, W, E, L, P>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
    processes: &P,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    P: ProcessLocator + ProcessLauncher + ProcessTerminator,
{
    CliRunner::new(io, loader, processes).run(args)
}

//! Runtime handles, output wrappers, and the production process backend.

use std::fmt;
use std::io::Write;

use super::LifecycleError;

/// Where a running instance was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleSource {
    PidFile,
    ProcessTable,
}

impl fmt::Display for HandleSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PidFile => formatter.write_str("pid file"),
            Self::ProcessTable => formatter.write_str("process table"),
        }
    }
}

/// A live daemon instance as observed by the locator.
///
/// Handles are produced fresh by every lookup and are never carried across
/// steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeHandle {
    pub pid: u32,
    pub source: HandleSource,
}

impl RuntimeHandle {
    pub const fn new(pid: u32, source: HandleSource) -> Self {
        Self { pid, source }
    }
}

/// Full result of probing for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Running(RuntimeHandle),
    /// The pid file names a pid that is not a live instance.
    Stale { pid: u32 },
    Absent,
}

impl Lookup {
    pub const fn running(self) -> Option<RuntimeHandle> {
        match self {
            Self::Running(handle) => Some(handle),
            Self::Stale { .. } | Self::Absent => None,
        }
    }
}

/// Process backend backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcesses;

/// Output handle abstracting over stdout/stderr writers.
pub struct LifecycleOutput<W: Write, E: Write> {
    pub stdout: W,
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    pub fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stdout.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stdout.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stdout.flush().map_err(LifecycleError::Io)
    }

    pub fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stderr.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stderr.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stderr.flush().map_err(LifecycleError::Io)
    }
}

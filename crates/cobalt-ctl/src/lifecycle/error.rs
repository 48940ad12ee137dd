//! Error types for service lifecycle operations.

use std::ffi::OsString;
use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;

use super::outcome::{Failure, OperationResult};

/// Errors raised while locating, launching, or terminating the daemon.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to open pid file directory {path:?}: {source}")]
    OpenPidDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read pid file {path:?}: {source}")]
    ReadPid {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse pid file {path:?}: {source}")]
    ParsePid {
        path: PathBuf,
        #[source]
        source: ParseIntError,
    },
    #[error("failed to write pid file {path:?}: {source}")]
    WritePid {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove pid file {path:?}: {source}")]
    RemovePid {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("daemon binary {binary:?} is not installed")]
    MissingBinary { binary: PathBuf },
    #[error("daemon binary {binary:?} is not an executable file")]
    BinaryNotExecutable { binary: PathBuf },
    #[error("unknown user '{user}'")]
    UnknownUser { user: String },
    #[error("unknown group '{group}'")]
    UnknownGroup { group: String },
    #[error("failed to resolve account '{name}': {source}")]
    ResolveOwner {
        name: String,
        #[source]
        source: Errno,
    },
    #[error("failed to spawn daemon binary '{binary:?}': {source}")]
    LaunchDaemon {
        binary: OsString,
        #[source]
        source: io::Error,
    },
    #[error("failed to monitor daemon launch: {source}")]
    MonitorChild {
        #[source]
        source: io::Error,
    },
    #[error("daemon exited during startup with status {code}")]
    StartupFailed { code: i32 },
    #[error("daemon detached but no running instance appeared within {} ms", .timeout.as_millis())]
    DetachedInstanceMissing { timeout: Duration },
    #[error("daemon did not confirm startup within {} ms", .timeout.as_millis())]
    StartupTimeout { timeout: Duration },
    #[error("failed to signal daemon pid {pid}: {source}")]
    SignalFailed {
        pid: u32,
        #[source]
        source: Errno,
    },
    #[error("daemon pid {pid} did not exit within {} ms", .timeout.as_millis())]
    ShutdownTimeout { pid: u32, timeout: Duration },
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}

impl LifecycleError {
    /// Classifies the error into the failure taxonomy reported to the caller.
    pub fn failure(&self) -> Failure {
        match self {
            Self::MissingBinary { .. } | Self::BinaryNotExecutable { .. } => Failure::NotInstalled,
            Self::UnknownUser { .. } | Self::UnknownGroup { .. } => Failure::NotConfigured,
            Self::LaunchDaemon { source, .. } => match source.kind() {
                io::ErrorKind::PermissionDenied => Failure::Permission,
                io::ErrorKind::NotFound => Failure::NotInstalled,
                _ => Failure::Generic,
            },
            Self::SignalFailed { source, .. } if *source == Errno::EPERM => Failure::Permission,
            Self::StartupFailed { code } => Failure::DaemonExit(*code),
            Self::DetachedInstanceMissing { .. } => Failure::DaemonExit(0),
            Self::StartupTimeout { .. } | Self::ShutdownTimeout { .. } => Failure::Timeout,
            _ => Failure::Generic,
        }
    }
}

impl From<LifecycleError> for OperationResult {
    fn from(error: LifecycleError) -> Self {
        Self::failed(error.failure()).with_message(error.to_string())
    }
}

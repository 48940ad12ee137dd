//! Derives the immutable service descriptor handed to every lifecycle step.
//!
//! The descriptor is the only view of configuration the process-control code
//! sees. It is built once per invocation and never re-read, so every step of a
//! multi-step verb acts on the same binary, arguments and pid file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::{Config, StartupTimeoutPolicy};

/// Identity and launch parameters of the managed daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    name: String,
    binary: PathBuf,
    arguments: Vec<OsString>,
    pid_file: PathBuf,
    user: Option<String>,
    group: Option<String>,
    startup_timeout: Duration,
    stop_timeout: Duration,
    startup_timeout_policy: StartupTimeoutPolicy,
    force_kill: bool,
}

impl ServiceDescriptor {
    /// Builds the descriptor from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the service name or binary path is
    /// unusable or an ownership override is blank.
    pub fn from_config(config: &Config) -> Result<Self, DescriptorError> {
        let name = config.service_name.trim();
        if name.is_empty() {
            return Err(DescriptorError::EmptyServiceName);
        }
        if name.contains('/') {
            return Err(DescriptorError::InvalidServiceName {
                name: name.to_owned(),
            });
        }
        if config.daemon_binary.as_str().trim().is_empty() {
            return Err(DescriptorError::EmptyBinary);
        }
        let user = owner_override("daemon_user", config.daemon_user.as_deref())?;
        let group = owner_override("daemon_group", config.daemon_group.as_deref())?;
        let pid_file = config.pid_file().into_std_path_buf();
        if pid_file.file_name().is_none() {
            return Err(DescriptorError::InvalidPidFile { path: pid_file });
        }

        Ok(Self {
            name: name.to_owned(),
            binary: config.daemon_binary.clone().into_std_path_buf(),
            arguments: daemon_arguments(config),
            pid_file,
            user,
            group,
            startup_timeout: Duration::from_secs(config.startup_timeout),
            stop_timeout: Duration::from_secs(config.stop_timeout),
            startup_timeout_policy: config.startup_timeout_policy,
            force_kill: config.force_kill,
        })
    }

    /// Display name used in progress lines.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Daemon executable.
    pub fn binary(&self) -> &Path {
        self.binary.as_path()
    }

    /// Full argument vector passed to the daemon (without argv[0]).
    pub fn arguments(&self) -> &[OsString] {
        self.arguments.as_slice()
    }

    /// Pid file used as the tracking artefact.
    pub fn pid_file(&self) -> &Path {
        self.pid_file.as_path()
    }

    /// User the daemon runs as, if overridden.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Group the daemon runs as, if overridden.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Window during which a fresh daemon is watched.
    pub const fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    /// Bound on waiting for the daemon to exit after `SIGTERM`.
    pub const fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Outcome for a daemon still alive when the startup window closes.
    pub const fn startup_timeout_policy(&self) -> StartupTimeoutPolicy {
        self.startup_timeout_policy
    }

    /// Whether to escalate to `SIGKILL` after the stop timeout.
    pub const fn force_kill(&self) -> bool {
        self.force_kill
    }
}

fn daemon_arguments(config: &Config) -> Vec<OsString> {
    let mut arguments = vec![
        OsString::from("--config-dir"),
        OsString::from(config.daemon_config_dir.as_str()),
        OsString::from("--logfile"),
        OsString::from(config.daemon_log_file.as_str()),
    ];
    if let Some(extra) = config.daemon_args.as_deref() {
        arguments.extend(extra.split_whitespace().map(OsString::from));
    }
    arguments
}

fn owner_override(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, DescriptorError> {
    match value.map(str::trim) {
        None => Ok(None),
        Some("") => Err(DescriptorError::BlankOwner { field }),
        Some(name) => Ok(Some(name.to_owned())),
    }
}

/// Errors raised while deriving the service descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// The service name was empty.
    #[error("service name must not be empty")]
    EmptyServiceName,
    /// The service name cannot be used to derive a pid file name.
    #[error("service name '{name}' must not contain '/'")]
    InvalidServiceName {
        /// Offending name.
        name: String,
    },
    /// The daemon binary path was empty.
    #[error("daemon binary path must not be empty")]
    EmptyBinary,
    /// A user or group override was present but blank.
    #[error("{field} must not be blank when set")]
    BlankOwner {
        /// Configuration key carrying the blank value.
        field: &'static str,
    },
    /// The pid file path has no file name component.
    #[error("pid file path {path:?} does not name a file")]
    InvalidPidFile {
        /// Offending path.
        path: PathBuf,
    },
}

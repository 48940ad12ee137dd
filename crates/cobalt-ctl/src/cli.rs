//! CLI argument definitions for the service controller.
//!
//! Shared by the runtime parser and the build script that renders the
//! manual page.

use clap::{Parser, ValueEnum};

/// Controls the cobalt-compute daemon following init-script conventions.
///
/// Configuration flags such as `--pid-file` or `--stop-timeout` must precede
/// the verb.
#[derive(Parser, Debug)]
#[command(name = "cobalt-compute-ctl", version)]
pub(crate) struct Cli {
    /// The lifecycle verb to run.
    #[arg(value_enum, value_name = "VERB")]
    pub(crate) verb: Verb,
}

/// Lifecycle verbs understood by the controller.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verb {
    /// Starts the daemon unless it is already running.
    Start,
    /// Stops the daemon; succeeds when it is not running.
    Stop,
    /// Stops the daemon, then starts it again.
    Restart,
    /// Accepted for compatibility; does nothing.
    Reload,
    /// Reports whether the daemon is running.
    Status,
    /// Same as `restart`.
    Condrestart,
    /// Same as `restart`.
    TryRestart,
}

impl Verb {
    #[allow(
        dead_code,
        reason = "used by lib.rs but not by build.rs which #[path]-includes cli.rs"
    )]
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Reload => "reload",
            Self::Status => "status",
            Self::Condrestart => "condrestart",
            Self::TryRestart => "try-restart",
        }
    }
}

//! Shared configuration for the `cobalt-compute` service controller.
//!
//! Settings are layered by `ortho_config`: built-in defaults, then a
//! configuration file (`--config-path`, `COBALT_CONFIG_PATH` or a discovered
//! `.cobalt.toml`), then `COBALT_*` environment variables, then command-line
//! flags. The loaded [`Config`] is turned into an immutable
//! [`ServiceDescriptor`] once per invocation.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod descriptor;
mod logging;
mod policy;

pub use defaults::{
    DEFAULT_DAEMON_BINARY, DEFAULT_DAEMON_CONFIG_DIR, DEFAULT_DAEMON_LOG_FILE, DEFAULT_LOG_FILTER,
    DEFAULT_PID_DIR, DEFAULT_SERVICE_NAME, DEFAULT_STARTUP_TIMEOUT_SECS, DEFAULT_STOP_TIMEOUT_SECS,
    default_daemon_binary, default_daemon_config_dir, default_daemon_log_file, default_log_filter,
    default_log_filter_string, default_log_format, default_pid_file, default_service_name,
    default_startup_timeout_policy,
};
pub use descriptor::{DescriptorError, ServiceDescriptor};
pub use logging::{LogFormat, LogFormatParseError};
pub use policy::StartupTimeoutPolicy;

/// Controller configuration shared by every lifecycle verb.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "COBALT")]
pub struct Config {
    /// Path to the daemon executable.
    #[ortho_config(default = defaults::default_daemon_binary())]
    pub daemon_binary: Utf8PathBuf,
    /// Display name; also names the default pid file.
    #[ortho_config(default = defaults::default_service_name())]
    pub service_name: String,
    /// Directory passed to the daemon as `--config-dir`.
    #[ortho_config(default = defaults::default_daemon_config_dir())]
    pub daemon_config_dir: Utf8PathBuf,
    /// File passed to the daemon as `--logfile`.
    #[ortho_config(default = defaults::default_daemon_log_file())]
    pub daemon_log_file: Utf8PathBuf,
    /// Explicit pid file; defaults to `/var/run/<service_name>.pid`.
    pub pid_file: Option<Utf8PathBuf>,
    /// User the daemon runs as; the invoking user when unset.
    pub daemon_user: Option<String>,
    /// Group the daemon runs as; the user's primary group when unset.
    pub daemon_group: Option<String>,
    /// Extra whitespace-separated arguments appended after the defaults.
    pub daemon_args: Option<String>,
    /// Seconds to watch a freshly spawned daemon.
    #[ortho_config(default = defaults::DEFAULT_STARTUP_TIMEOUT_SECS)]
    pub startup_timeout: u64,
    /// Seconds to wait for the daemon to exit after `SIGTERM`.
    #[ortho_config(default = defaults::DEFAULT_STOP_TIMEOUT_SECS)]
    pub stop_timeout: u64,
    /// Outcome for a daemon still alive when the startup window closes.
    #[ortho_config(default = defaults::default_startup_timeout_policy())]
    pub startup_timeout_policy: StartupTimeoutPolicy,
    /// Sends `SIGKILL` when the daemon ignores `SIGTERM` past the stop timeout.
    #[ortho_config(default = false)]
    pub force_kill: bool,
    /// Tracing filter for the controller's own diagnostics.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for the controller's own diagnostics.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_binary: default_daemon_binary(),
            service_name: default_service_name(),
            daemon_config_dir: default_daemon_config_dir(),
            daemon_log_file: default_daemon_log_file(),
            pid_file: None,
            daemon_user: None,
            daemon_group: None,
            daemon_args: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT_SECS,
            stop_timeout: DEFAULT_STOP_TIMEOUT_SECS,
            startup_timeout_policy: default_startup_timeout_policy(),
            force_kill: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Tracing filter expression.
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Diagnostic output format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Pid file path, falling back to the conventional location.
    pub fn pid_file(&self) -> Utf8PathBuf {
        self.pid_file
            .clone()
            .unwrap_or_else(|| default_pid_file(&self.service_name))
    }
}

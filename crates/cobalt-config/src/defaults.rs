//! Built-in defaults mirroring the packaged `cobalt-compute` service.

use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::policy::StartupTimeoutPolicy;

/// Name reported in progress lines and used for the default pid file.
pub const DEFAULT_SERVICE_NAME: &str = "cobalt-compute";

/// Location of the daemon installed by the `cobalt-compute` package.
pub const DEFAULT_DAEMON_BINARY: &str = "/usr/bin/cobalt-compute";

/// Configuration directory handed to the daemon through `--config-dir`.
pub const DEFAULT_DAEMON_CONFIG_DIR: &str = "/etc/nova";

/// Log file handed to the daemon through `--logfile`.
pub const DEFAULT_DAEMON_LOG_FILE: &str = "/var/log/nova/cobalt-compute.log";

/// Directory holding pid files when no explicit path is configured.
pub const DEFAULT_PID_DIR: &str = "/var/run";

/// Seconds the launcher watches a fresh daemon before reporting.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 5;

/// Seconds the terminator waits for the daemon to exit after `SIGTERM`.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

/// Default log filter expression for the controller's own diagnostics.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default daemon binary as an owned path.
pub fn default_daemon_binary() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DAEMON_BINARY)
}

/// Default service name as an owned string.
pub fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_owned()
}

/// Default daemon configuration directory.
pub fn default_daemon_config_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DAEMON_CONFIG_DIR)
}

/// Default daemon log file.
pub fn default_daemon_log_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DAEMON_LOG_FILE)
}

/// Conventional pid file location for a service name.
pub fn default_pid_file(service_name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PID_DIR).join(format!("{service_name}.pid"))
}

/// Default log filter expression.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log format. Progress lines go to stdout, so diagnostics stay terse.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default handling of a daemon still alive when the startup window closes.
pub fn default_startup_timeout_policy() -> StartupTimeoutPolicy {
    StartupTimeoutPolicy::AssumeRunning
}

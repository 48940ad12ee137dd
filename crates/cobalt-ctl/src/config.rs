//! Configuration loading for the controller.
//!
//! Leading configuration flags are peeled off the command line and handed to
//! `ortho-config`; everything from the first other token onwards is parsed as
//! the verb.

use std::ffi::{OsStr, OsString};

use cobalt_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

/// Flags consumed by the configuration loader; each takes one value.
///
/// MAINTENANCE: keep in sync with the fields of `cobalt_config::Config`.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--daemon-binary",
    "--service-name",
    "--daemon-config-dir",
    "--daemon-log-file",
    "--pid-file",
    "--daemon-user",
    "--daemon-group",
    "--daemon-args",
    "--startup-timeout",
    "--stop-timeout",
    "--startup-timeout-policy",
    "--log-filter",
    "--log-format",
];

/// Boolean configuration flags that never consume a following value.
pub(crate) const CONFIG_CLI_SWITCHES: &[&str] = &["--force-kill"];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags must appear before the verb. A configuration flag
    /// after the verb reaches the verb parser and is rejected as a usage
    /// error.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

fn classify_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };

    if CONFIG_CLI_SWITCHES.contains(&flag) {
        return FlagAction::Include { needs_value: false };
    }
    if CONFIG_CLI_FLAGS.contains(&flag) {
        return FlagAction::Include {
            needs_value: !has_inline_value,
        };
    }
    FlagAction::Skip
}

/// Configuration arguments (with argv\[0\]) and the index of the first
/// remaining token.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut index = 1;
    while let Some(argument) = args.get(index) {
        let FlagAction::Include { needs_value } = classify_flag(argument) else {
            break;
        };
        config_arguments.push(argument.clone());
        index += 1;
        if needs_value {
            if let Some(value) = args.get(index) {
                config_arguments.push(value.clone());
                index += 1;
            }
        }
    }

    ConfigArgumentSplit {
        config_arguments,
        command_start: index,
    }
}

/// Rebuilds the argument list seen by the verb parser: argv\[0\] followed by
/// everything after the configuration flags.
pub(crate) fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start.max(1)))
        .cloned()
        .collect()
}

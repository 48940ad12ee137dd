//! Policy applied when the startup window closes with the daemon still alive.
//!
//! A daemon that neither exits nor detaches during the window has not proven
//! failure, but it has not proven readiness either. Operators pick which way
//! that ambiguity resolves.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Outcome assigned to a daemon still running when the startup window closes.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum StartupTimeoutPolicy {
    /// Treat the live process as started.
    #[default]
    AssumeRunning,
    /// Report a timeout failure; suits daemons that detach once ready.
    Fail,
}

//! Process control for the managed daemon.
//!
//! The module is split by concern:
//! - [`types`] defines runtime handles, lookups, and the output wrapper.
//! - [`outcome`] holds step results and exit-code aggregation.
//! - [`error`] captures component errors and classifies them.
//! - [`wait`] provides the bounded polling helper.
//! - [`pidfile`] and [`process`] wrap the tracking file and process table.
//! - [`locator`], [`spawning`], and [`shutdown`] implement the components.
//! - [`status`] maps lookups onto status lines.
//! - [`controller`] dispatches verbs onto the components.

mod controller;
mod error;
mod locator;
mod outcome;
mod pidfile;
mod process;
mod shutdown;
mod spawning;
mod status;
mod types;
mod wait;

/// Tracing target for lifecycle events.
pub(crate) const LIFECYCLE_TARGET: &str = "cobalt_ctl::lifecycle";

pub use controller::ServiceController;
pub use error::LifecycleError;
pub use locator::ProcessLocator;
pub use outcome::{Failure, GENERIC_FAILURE_EXIT_CODE, USAGE_EXIT_CODE};
pub use shutdown::ProcessTerminator;
pub use spawning::ProcessLauncher;
pub use types::{LifecycleOutput, SystemProcesses};

#[cfg(test)]
pub(crate) use outcome::OperationResult;
#[cfg(test)]
pub(crate) use types::{HandleSource, Lookup, RuntimeHandle};

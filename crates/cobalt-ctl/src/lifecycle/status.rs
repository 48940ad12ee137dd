//! Maps locator answers onto init-system status codes.

use cobalt_config::ServiceDescriptor;

use super::error::LifecycleError;
use super::locator::ProcessLocator;
use super::outcome::{Failure, OperationResult};
use super::types::Lookup;

/// Reports the daemon's state as a status line and outcome.
///
/// | lookup  | outcome               | exit |
/// |---------|-----------------------|------|
/// | running | success               | 0    |
/// | absent  | skipped               | 3    |
/// | stale   | failed (stale pid)    | 1    |
/// | error   | failed (unknown)      | 4    |
pub fn report_status<L: ProcessLocator>(
    locator: &L,
    descriptor: &ServiceDescriptor,
) -> OperationResult {
    describe(descriptor.name(), locator.probe(descriptor))
}

fn describe(name: &str, lookup: Result<Lookup, LifecycleError>) -> OperationResult {
    match lookup {
        Ok(Lookup::Running(handle)) => {
            OperationResult::success().with_message(format!("{name} (pid {}) is running...", handle.pid))
        }
        Ok(Lookup::Absent) => OperationResult::skipped().with_message(format!("{name} is stopped")),
        Ok(Lookup::Stale { .. }) => OperationResult::failed(Failure::StaleTracking)
            .with_message(format!("{name} dead but pid file exists")),
        Err(error) => OperationResult::failed(Failure::Unknown)
            .with_message(format!("{name} status unknown: {error}")),
    }
}

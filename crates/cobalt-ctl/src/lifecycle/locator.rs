//! Determines whether the daemon is running and which pid it has.

use cobalt_config::ServiceDescriptor;
use tracing::debug;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::pidfile::read_pid;
use super::process::{is_alive, runs_binary, scan_for_binary};
use super::types::{HandleSource, Lookup, RuntimeHandle, SystemProcesses};

/// Finds the running daemon instance, if any.
pub trait ProcessLocator {
    /// Probes the pid file and process table.
    ///
    /// An unreadable or malformed pid file is an error rather than a
    /// "not running" answer.
    fn probe(&self, descriptor: &ServiceDescriptor) -> Result<Lookup, LifecycleError>;

    fn locate(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> Result<Option<RuntimeHandle>, LifecycleError> {
        self.probe(descriptor).map(Lookup::running)
    }
}

impl ProcessLocator for SystemProcesses {
    fn probe(&self, descriptor: &ServiceDescriptor) -> Result<Lookup, LifecycleError> {
        let recorded = read_pid(descriptor.pid_file())?;
        if let Some(pid) = recorded {
            if is_alive(pid) && runs_binary(pid, descriptor.binary()) {
                debug!(target: LIFECYCLE_TARGET, pid, source = %HandleSource::PidFile, "daemon located");
                return Ok(Lookup::Running(RuntimeHandle::new(pid, HandleSource::PidFile)));
            }
            debug!(target: LIFECYCLE_TARGET, pid, "pid file does not name a live instance");
        }

        if let Some(pid) = scan_for_binary(descriptor.binary()).first().copied() {
            debug!(target: LIFECYCLE_TARGET, pid, source = %HandleSource::ProcessTable, "daemon located");
            return Ok(Lookup::Running(RuntimeHandle::new(
                pid,
                HandleSource::ProcessTable,
            )));
        }

        Ok(match recorded {
            Some(pid) => Lookup::Stale { pid },
            None => Lookup::Absent,
        })
    }
}

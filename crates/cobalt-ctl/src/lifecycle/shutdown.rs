//! Daemon termination.
//!
//! Sends `SIGTERM`, then confirms the exit with an escalating poll bounded by
//! the descriptor's stop timeout. With `force_kill` enabled a daemon that
//! outlives the timeout receives `SIGKILL` and one more bounded wait.

use std::time::Duration;

use cobalt_config::ServiceDescriptor;
use nix::sys::signal::Signal;
use tracing::{debug, info, warn};

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::outcome::OperationResult;
use super::pidfile::remove_pid_if_matches;
use super::process::{Delivery, is_alive, send_signal};
use super::types::{RuntimeHandle, SystemProcesses};
use super::wait::{BoundedWait, WaitOutcome};

const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Stops a running daemon instance.
pub trait ProcessTerminator {
    fn terminate(&self, descriptor: &ServiceDescriptor, handle: RuntimeHandle) -> OperationResult;
}

impl ProcessTerminator for SystemProcesses {
    fn terminate(&self, descriptor: &ServiceDescriptor, handle: RuntimeHandle) -> OperationResult {
        terminate_daemon(descriptor, handle).unwrap_or_else(OperationResult::from)
    }
}

fn terminate_daemon(
    descriptor: &ServiceDescriptor,
    handle: RuntimeHandle,
) -> Result<OperationResult, LifecycleError> {
    let pid = handle.pid;
    let message = match send_signal(pid, Signal::SIGTERM)? {
        Delivery::AlreadyGone => {
            debug!(target: LIFECYCLE_TARGET, pid, "daemon exited before SIGTERM");
            format!("{} stopped (pid {pid} already gone)", descriptor.name())
        }
        Delivery::Sent => {
            info!(target: LIFECYCLE_TARGET, pid, "sent SIGTERM");
            confirm_exit(descriptor, pid)?
        }
    };
    remove_pid_if_matches(descriptor.pid_file(), pid)?;
    Ok(OperationResult::success().with_message(message))
}

fn confirm_exit(descriptor: &ServiceDescriptor, pid: u32) -> Result<String, LifecycleError> {
    let timeout = descriptor.stop_timeout();
    if wait_for_exit(pid, timeout) {
        return Ok(format!("{} stopped (pid {pid})", descriptor.name()));
    }
    if !descriptor.force_kill() {
        return Err(LifecycleError::ShutdownTimeout { pid, timeout });
    }

    warn!(target: LIFECYCLE_TARGET, pid, "daemon ignored SIGTERM; sending SIGKILL");
    if send_signal(pid, Signal::SIGKILL)? == Delivery::Sent && !wait_for_exit(pid, KILL_GRACE) {
        return Err(LifecycleError::ShutdownTimeout {
            pid,
            timeout: timeout.saturating_add(KILL_GRACE),
        });
    }
    Ok(format!("{} killed (pid {pid})", descriptor.name()))
}

/// Waits until `pid` is gone; liveness is re-derived on every poll.
fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let wait = BoundedWait::escalating(INITIAL_POLL_INTERVAL, MAX_POLL_INTERVAL, timeout);
    let outcome: Result<_, LifecycleError> = wait.poll(|| Ok((!is_alive(pid)).then_some(())));
    matches!(outcome, Ok(WaitOutcome::Ready(())))
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;

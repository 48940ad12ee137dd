//! Daemon process spawning and startup supervision.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use cobalt_config::{ServiceDescriptor, StartupTimeoutPolicy};
use nix::unistd::{Gid, Group, Uid, User};
use tracing::{debug, info, warn};

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;
use super::locator::ProcessLocator;
use super::outcome::OperationResult;
use super::pidfile::{remove_pid_if_matches, write_pid};
use super::types::{Lookup, RuntimeHandle, SystemProcesses};
use super::wait::{BoundedWait, WaitOutcome};

const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Starts a new daemon instance.
pub trait ProcessLauncher {
    /// Spawns the daemon and watches it for `timeout`.
    ///
    /// Callers establish beforehand that no instance is running.
    fn launch(&self, descriptor: &ServiceDescriptor, timeout: Duration) -> OperationResult;
}

impl ProcessLauncher for SystemProcesses {
    fn launch(&self, descriptor: &ServiceDescriptor, timeout: Duration) -> OperationResult {
        launch_daemon(self, descriptor, timeout).unwrap_or_else(OperationResult::from)
    }
}

/// Account the daemon runs under when overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Owner {
    uid: Option<Uid>,
    gid: Option<Gid>,
}

/// What the startup watch observed.
enum StartupEvent {
    Exited(ExitStatus),
    Detached(RuntimeHandle),
}

fn launch_daemon<L: ProcessLocator>(
    locator: &L,
    descriptor: &ServiceDescriptor,
    timeout: Duration,
) -> Result<OperationResult, LifecycleError> {
    ensure_executable(descriptor.binary())?;
    let owner = resolve_owner(descriptor)?;
    let mut child = spawn_daemon(descriptor, owner)?;
    let pid = child.id();
    info!(
        target: LIFECYCLE_TARGET,
        pid,
        binary = %descriptor.binary().display(),
        "spawned daemon"
    );
    if let Err(error) = write_pid(descriptor.pid_file(), pid) {
        // An untracked daemon would be invisible to a later stop.
        discard_child(&mut child);
        return Err(error);
    }

    match watch_startup(locator, descriptor, &mut child, timeout) {
        Ok(WaitOutcome::Ready(StartupEvent::Exited(status))) => {
            clear_pid_file(descriptor, pid);
            Err(LifecycleError::StartupFailed {
                code: exit_code_of(status),
            })
        }
        Ok(WaitOutcome::Ready(StartupEvent::Detached(handle))) => {
            record_detached(descriptor, handle)
        }
        Ok(WaitOutcome::TimedOut) => startup_window_closed(locator, descriptor, &mut child, timeout),
        Err(error) => {
            clear_pid_file(descriptor, pid);
            Err(error)
        }
    }
}

fn record_detached(
    descriptor: &ServiceDescriptor,
    handle: RuntimeHandle,
) -> Result<OperationResult, LifecycleError> {
    write_pid(descriptor.pid_file(), handle.pid)?;
    debug!(target: LIFECYCLE_TARGET, pid = handle.pid, "daemon detached");
    Ok(OperationResult::success()
        .with_message(format!("{} started (pid {})", descriptor.name(), handle.pid)))
}

/// Settles a launch once the watch window has closed.
///
/// A child that exited zero gets one final locator lookup, so a zero-length
/// window still recognises an instance that detached straight away.
fn startup_window_closed<L: ProcessLocator>(
    locator: &L,
    descriptor: &ServiceDescriptor,
    child: &mut Child,
    timeout: Duration,
) -> Result<OperationResult, LifecycleError> {
    let pid = child.id();
    let exited = child
        .try_wait()
        .map_err(|source| LifecycleError::MonitorChild { source })?;
    if let Some(status) = exited {
        let settled = if status.success() {
            match locator.probe(descriptor) {
                Ok(Lookup::Running(handle)) => return record_detached(descriptor, handle),
                Ok(Lookup::Stale { .. } | Lookup::Absent) => {
                    LifecycleError::DetachedInstanceMissing { timeout }
                }
                Err(error) => error,
            }
        } else {
            LifecycleError::StartupFailed {
                code: exit_code_of(status),
            }
        };
        clear_pid_file(descriptor, pid);
        return Err(settled);
    }
    match descriptor.startup_timeout_policy() {
        StartupTimeoutPolicy::AssumeRunning => {
            debug!(target: LIFECYCLE_TARGET, pid, "daemon alive when startup window closed");
            Ok(OperationResult::success()
                .with_message(format!("{} started (pid {pid})", descriptor.name())))
        }
        StartupTimeoutPolicy::Fail => {
            warn!(target: LIFECYCLE_TARGET, pid, "startup not confirmed; stopping daemon");
            discard_child(child);
            clear_pid_file(descriptor, pid);
            Err(LifecycleError::StartupTimeout { timeout })
        }
    }
}

fn watch_startup<L: ProcessLocator>(
    locator: &L,
    descriptor: &ServiceDescriptor,
    child: &mut Child,
    timeout: Duration,
) -> Result<WaitOutcome<StartupEvent>, LifecycleError> {
    let mut detached = false;
    BoundedWait::fixed(STARTUP_POLL_INTERVAL, timeout).poll(|| {
        if !detached {
            match child
                .try_wait()
                .map_err(|source| LifecycleError::MonitorChild { source })?
            {
                Some(status) if status.success() => detached = true,
                Some(status) => return Ok(Some(StartupEvent::Exited(status))),
                None => return Ok(None),
            }
        }
        match locator.probe(descriptor)? {
            Lookup::Running(handle) => Ok(Some(StartupEvent::Detached(handle))),
            Lookup::Stale { .. } | Lookup::Absent => Ok(None),
        }
    })
}

fn ensure_executable(binary: &Path) -> Result<(), LifecycleError> {
    let metadata = match fs::metadata(binary) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(LifecycleError::MissingBinary {
                binary: binary.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(LifecycleError::LaunchDaemon {
                binary: binary.as_os_str().to_owned(),
                source,
            });
        }
    };
    if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
        return Err(LifecycleError::BinaryNotExecutable {
            binary: binary.to_path_buf(),
        });
    }
    Ok(())
}

fn resolve_owner(descriptor: &ServiceDescriptor) -> Result<Owner, LifecycleError> {
    let mut owner = Owner::default();
    if let Some(name) = descriptor.user() {
        let user = User::from_name(name)
            .map_err(|source| LifecycleError::ResolveOwner {
                name: name.to_owned(),
                source,
            })?
            .ok_or_else(|| LifecycleError::UnknownUser {
                user: name.to_owned(),
            })?;
        owner.uid = Some(user.uid);
        owner.gid = Some(user.gid);
    }
    if let Some(name) = descriptor.group() {
        let group = Group::from_name(name)
            .map_err(|source| LifecycleError::ResolveOwner {
                name: name.to_owned(),
                source,
            })?
            .ok_or_else(|| LifecycleError::UnknownGroup {
                group: name.to_owned(),
            })?;
        owner.gid = Some(group.gid);
    }
    Ok(owner)
}

fn spawn_daemon(descriptor: &ServiceDescriptor, owner: Owner) -> Result<Child, LifecycleError> {
    let mut command = Command::new(descriptor.binary());
    command
        .args(descriptor.arguments())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        // Detach from the controller's process group so terminal signals
        // aimed at the controller do not reach the daemon.
        .process_group(0);
    if let Some(gid) = owner.gid {
        command.gid(gid.as_raw());
    }
    if let Some(uid) = owner.uid {
        command.uid(uid.as_raw());
    }
    command.spawn().map_err(|source| LifecycleError::LaunchDaemon {
        binary: descriptor.binary().as_os_str().to_owned(),
        source,
    })
}

/// Drops the pid file of a launch that did not produce a daemon.
fn clear_pid_file(descriptor: &ServiceDescriptor, pid: u32) {
    if let Err(error) = remove_pid_if_matches(descriptor.pid_file(), pid) {
        warn!(
            target: LIFECYCLE_TARGET,
            pid,
            path = %descriptor.pid_file().display(),
            %error,
            "failed to remove pid file of failed launch"
        );
    }
}

fn discard_child(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Exit code reported for a daemon that ended during startup; signal deaths
/// follow the shell convention of `128 + signo`.
fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(test)]
#[path = "spawning_tests.rs"]
mod tests;

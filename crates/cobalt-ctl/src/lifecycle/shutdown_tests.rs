//! Tests for daemon termination against real child processes.

use std::path::Path;
use std::process::{Child, Command};
use std::thread;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::lifecycle::outcome::{Failure, Outcome};
use crate::lifecycle::pidfile::{read_pid, write_pid};
use crate::lifecycle::types::HandleSource;
use crate::tests::support::{FOREVER_DAEMON, descriptor_with, process_lock, write_script};

/// Reaps the child when a test ends, whatever state it is in.
struct Daemon(Child);

impl Daemon {
    fn pid(&self) -> u32 {
        self.0.id()
    }

    fn handle(&self) -> RuntimeHandle {
        RuntimeHandle::new(self.pid(), HandleSource::PidFile)
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

#[fixture]
fn run_dir() -> TempDir {
    TempDir::new().expect("temp dir")
}

fn spawn(binary: &Path) -> Daemon {
    Daemon(Command::new(binary).spawn().expect("spawn daemon"))
}

/// Spawns a daemon that ignores `SIGTERM` and waits until the trap is set.
fn spawn_stubborn(dir: &Path) -> Daemon {
    let ready = dir.join("ready");
    let body = format!(
        "#!/bin/sh\ntrap '' TERM\n: > '{}'\nwhile :; do sleep 1; done\n",
        ready.display()
    );
    let daemon = spawn(&write_script(dir, "cobalt-compute", &body));
    let deadline = Instant::now() + Duration::from_secs(5);
    while !ready.exists() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(ready.exists(), "stubborn daemon never became ready");
    daemon
}

#[rstest]
fn terminate_stops_daemon_and_clears_pid_file(run_dir: TempDir) {
    let _guard = process_lock();
    let binary = write_script(run_dir.path(), "cobalt-compute", FOREVER_DAEMON);
    let daemon = spawn(&binary);
    let descriptor = descriptor_with(run_dir.path(), &binary, |_| {});
    write_pid(descriptor.pid_file(), daemon.pid()).expect("write pid");

    let result = SystemProcesses.terminate(&descriptor, daemon.handle());

    assert_eq!(result.outcome(), Outcome::Success);
    assert_eq!(
        result.message(),
        Some(format!("cobalt-compute stopped (pid {})", daemon.pid()).as_str())
    );
    assert!(!is_alive(daemon.pid()));
    assert_eq!(read_pid(descriptor.pid_file()).expect("read pid"), None);
}

#[rstest]
fn maximal_stop_timeout_still_confirms_exit(run_dir: TempDir) {
    let _guard = process_lock();
    let binary = write_script(run_dir.path(), "cobalt-compute", FOREVER_DAEMON);
    let daemon = spawn(&binary);
    let descriptor = descriptor_with(run_dir.path(), &binary, |config| {
        config.stop_timeout = u64::MAX;
        config.force_kill = true;
    });

    let result = SystemProcesses.terminate(&descriptor, daemon.handle());

    assert_eq!(result.outcome(), Outcome::Success);
    assert!(!is_alive(daemon.pid()));
}

#[rstest]
fn pid_file_naming_another_pid_is_kept(run_dir: TempDir) {
    let _guard = process_lock();
    let binary = write_script(run_dir.path(), "cobalt-compute", FOREVER_DAEMON);
    let daemon = spawn(&binary);
    let descriptor = descriptor_with(run_dir.path(), &binary, |_| {});
    write_pid(descriptor.pid_file(), 4242).expect("write pid");

    let result = SystemProcesses.terminate(&descriptor, daemon.handle());

    assert_eq!(result.outcome(), Outcome::Success);
    assert_eq!(read_pid(descriptor.pid_file()).expect("read pid"), Some(4242));
}

#[rstest]
fn vanished_daemon_counts_as_stopped(run_dir: TempDir) {
    let _guard = process_lock();
    let mut child = Command::new("true").spawn().expect("spawn true");
    let pid = child.id();
    child.wait().expect("reap");
    let descriptor = descriptor_with(run_dir.path(), Path::new("/bin/true"), |_| {});

    let result = SystemProcesses.terminate(
        &descriptor,
        RuntimeHandle::new(pid, HandleSource::ProcessTable),
    );

    assert_eq!(result.outcome(), Outcome::Success);
    assert!(
        result
            .message()
            .is_some_and(|message| message.contains("already gone"))
    );
}

#[rstest]
fn daemon_ignoring_sigterm_times_out(run_dir: TempDir) {
    let _guard = process_lock();
    let daemon = spawn_stubborn(run_dir.path());
    let binary = run_dir.path().join("cobalt-compute");
    let descriptor = descriptor_with(run_dir.path(), &binary, |config| {
        config.stop_timeout = 1;
    });

    let started = Instant::now();
    let result = SystemProcesses.terminate(&descriptor, daemon.handle());

    assert_eq!(result.outcome(), Outcome::Failed(Failure::Timeout));
    assert_eq!(result.outcome().exit_code(), 1);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(is_alive(daemon.pid()), "no SIGKILL without force_kill");
}

#[rstest]
fn force_kill_escalates_to_sigkill(run_dir: TempDir) {
    let _guard = process_lock();
    let daemon = spawn_stubborn(run_dir.path());
    let binary = run_dir.path().join("cobalt-compute");
    let descriptor = descriptor_with(run_dir.path(), &binary, |config| {
        config.stop_timeout = 1;
        config.force_kill = true;
    });

    let result = SystemProcesses.terminate(&descriptor, daemon.handle());

    assert_eq!(result.outcome(), Outcome::Success);
    assert_eq!(
        result.message(),
        Some(format!("cobalt-compute killed (pid {})", daemon.pid()).as_str())
    );
    assert!(!is_alive(daemon.pid()));
}

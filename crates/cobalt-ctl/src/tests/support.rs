//! Test support for lifecycle and CLI coverage.
//!
//! Supplies a scripted process backend, descriptor builders rooted in a
//! temporary directory, and fake daemon scripts.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use camino::Utf8PathBuf;
use cobalt_config::{Config, ServiceDescriptor};
use rstest::fixture;

use crate::config::ConfigLoader;
use crate::{AppError, IoStreams, run_with};
use crate::lifecycle::{
    HandleSource, LifecycleError, Lookup, OperationResult, ProcessLauncher, ProcessLocator,
    ProcessTerminator, RuntimeHandle,
};

/// Shell daemon that runs until signalled.
pub(crate) const FOREVER_DAEMON: &str = "#!/bin/sh\nwhile :; do sleep 1; done\n";
/// Shell daemon that ignores `SIGTERM`.
pub(crate) const STUBBORN_DAEMON: &str = "#!/bin/sh\ntrap '' TERM\nwhile :; do sleep 1; done\n";

static PROCESS_LOCK: Mutex<()> = Mutex::new(());

/// Serialises tests that write executables or spawn processes.
///
/// A child forked while another thread still holds a freshly written script
/// open for writing makes exec of that script fail with `ETXTBSY`.
pub(crate) fn process_lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writes an executable script into `dir`. Callers hold [`process_lock`].
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// Configuration rooted in `dir` with the given daemon binary.
pub(crate) fn config_in(dir: &Path, binary: &Path) -> Config {
    let utf8 = |path: &Path| Utf8PathBuf::from(path.to_str().expect("utf8 test path"));
    Config {
        daemon_binary: utf8(binary),
        daemon_config_dir: utf8(dir),
        daemon_log_file: utf8(&dir.join("cobalt-compute.log")),
        pid_file: Some(utf8(&dir.join("run").join("cobalt-compute.pid"))),
        startup_timeout: 1,
        stop_timeout: 2,
        ..Config::default()
    }
}

pub(crate) fn descriptor_in(dir: &Path, binary: &Path) -> ServiceDescriptor {
    descriptor_with(dir, binary, |_| {})
}

pub(crate) fn descriptor_with(
    dir: &Path,
    binary: &Path,
    adjust: impl FnOnce(&mut Config),
) -> ServiceDescriptor {
    let mut config = config_in(dir, binary);
    adjust(&mut config);
    ServiceDescriptor::from_config(&config).expect("descriptor")
}

/// A config loader that returns a fixed configuration.
pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// A recorded backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessCall {
    Probe,
    Launch { timeout: Duration },
    Terminate { pid: u32 },
}

/// Scripted process backend.
///
/// Probes pop queued lookups first and fall back to the steady state, which
/// starts out absent. Launches and terminations pop queued results and
/// otherwise succeed.
#[derive(Default)]
pub(crate) struct TestProcesses {
    lookups: RefCell<VecDeque<Result<Lookup, LifecycleError>>>,
    steady: Cell<Option<Lookup>>,
    launches: RefCell<VecDeque<OperationResult>>,
    terminations: RefCell<VecDeque<OperationResult>>,
    calls: RefCell<Vec<ProcessCall>>,
}

impl TestProcesses {
    /// A backend whose daemon is running with `pid`.
    pub(crate) fn running(pid: u32) -> Self {
        let processes = Self::default();
        processes.set_steady(running_lookup(pid));
        processes
    }

    pub(crate) fn set_steady(&self, lookup: Lookup) {
        self.steady.set(Some(lookup));
    }

    pub(crate) fn enqueue_lookup(&self, lookup: Result<Lookup, LifecycleError>) {
        self.lookups.borrow_mut().push_back(lookup);
    }

    pub(crate) fn enqueue_launch(&self, result: OperationResult) {
        self.launches.borrow_mut().push_back(result);
    }

    pub(crate) fn enqueue_termination(&self, result: OperationResult) {
        self.terminations.borrow_mut().push_back(result);
    }

    pub(crate) fn calls(&self) -> Vec<ProcessCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn launch_count(&self) -> usize {
        self.count(|call| matches!(call, ProcessCall::Launch { .. }))
    }

    pub(crate) fn terminate_count(&self) -> usize {
        self.count(|call| matches!(call, ProcessCall::Terminate { .. }))
    }

    fn count(&self, predicate: impl Fn(&ProcessCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }
}

impl ProcessLocator for TestProcesses {
    fn probe(&self, _descriptor: &ServiceDescriptor) -> Result<Lookup, LifecycleError> {
        self.calls.borrow_mut().push(ProcessCall::Probe);
        self.lookups
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(self.steady.get().unwrap_or(Lookup::Absent)))
    }
}

impl ProcessLauncher for TestProcesses {
    fn launch(&self, descriptor: &ServiceDescriptor, timeout: Duration) -> OperationResult {
        self.calls.borrow_mut().push(ProcessCall::Launch { timeout });
        self.launches.borrow_mut().pop_front().unwrap_or_else(|| {
            OperationResult::success().with_message(format!("{} started", descriptor.name()))
        })
    }
}

impl ProcessTerminator for TestProcesses {
    fn terminate(&self, descriptor: &ServiceDescriptor, handle: RuntimeHandle) -> OperationResult {
        self.calls
            .borrow_mut()
            .push(ProcessCall::Terminate { pid: handle.pid });
        self.terminations.borrow_mut().pop_front().unwrap_or_else(|| {
            OperationResult::success().with_message(format!("{} stopped", descriptor.name()))
        })
    }
}

pub(crate) const fn running_lookup(pid: u32) -> Lookup {
    Lookup::Running(RuntimeHandle::new(pid, HandleSource::PidFile))
}

/// Harness state shared by behaviour steps.
pub(crate) struct TestWorld {
    pub(crate) config: Config,
    pub(crate) processes: TestProcesses,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
    pub(crate) exit_code: Option<ExitCode>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            config: config_in(
                Path::new("/srv/cobalt"),
                Path::new("/usr/bin/cobalt-compute"),
            ),
            processes: TestProcesses::default(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        }
    }
}

impl TestWorld {
    /// Runs the controller with `command` as the words after the program name.
    pub(crate) fn run(&mut self, command: &str) {
        self.stdout.clear();
        self.stderr.clear();
        let args = std::iter::once("cobalt-compute-ctl")
            .chain(command.split_whitespace())
            .map(OsString::from)
            .collect::<Vec<_>>();
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut io = IoStreams::new(&mut self.stdout, &mut self.stderr);
        self.exit_code = Some(run_with(args, &mut io, &loader, &self.processes));
    }

    pub(crate) fn assert_exit_code(&self, expected: u8) {
        assert_eq!(self.exit_code, Some(ExitCode::from(expected)), "{}", self.transcript());
    }

    pub(crate) fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub(crate) fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    fn transcript(&self) -> String {
        format!(
            "stdout:\n{}\nstderr:\n{}",
            self.stdout_text(),
            self.stderr_text()
        )
    }
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

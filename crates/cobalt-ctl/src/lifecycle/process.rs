//! Process-table queries: liveness, signalling, and command-line matching.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use sysinfo::{Pid as TablePid, Process, ProcessRefreshKind, ProcessStatus, System, UpdateKind};

use super::error::LifecycleError;

/// Longest `#!` line considered when reading a script's interpreter.
const SHEBANG_LIMIT: u64 = 256;

/// Result of delivering a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Sent,
    /// The process no longer exists.
    AlreadyGone,
}

fn to_pid(pid: u32) -> Option<Pid> {
    // Values beyond i32::MAX would be read as process-group targets by kill(2).
    i32::try_from(pid).ok().filter(|raw| *raw > 0).map(Pid::from_raw)
}

/// Reports whether `pid` names a live, non-zombie process.
///
/// A process owned by another user still counts as alive.
pub(crate) fn is_alive(pid: u32) -> bool {
    let Some(target) = to_pid(pid) else {
        return false;
    };
    match signal::kill(target, None) {
        Ok(()) | Err(Errno::EPERM) => !is_zombie(pid),
        Err(_) => false,
    }
}

/// Sends `signal` to `pid`.
pub(crate) fn send_signal(pid: u32, signal: Signal) -> Result<Delivery, LifecycleError> {
    let Some(target) = to_pid(pid) else {
        return Err(LifecycleError::SignalFailed {
            pid,
            source: Errno::EINVAL,
        });
    };
    match signal::kill(target, signal) {
        Ok(()) => Ok(Delivery::Sent),
        Err(Errno::ESRCH) => Ok(Delivery::AlreadyGone),
        Err(source) => Err(LifecycleError::SignalFailed { pid, source }),
    }
}

/// Decides whether a command line belongs to an instance of a binary.
///
/// Matches a direct exec of the binary path and a bare program name
/// resolved through `PATH`. When the binary is a script, an interpreter
/// named on its `#!` line running the binary as its first argument also
/// matches.
#[derive(Debug, Clone)]
pub(crate) struct CommandMatcher<'a> {
    binary: &'a Path,
    interpreters: Vec<OsString>,
}

impl<'a> CommandMatcher<'a> {
    pub(crate) fn new(binary: &'a Path) -> Self {
        Self {
            binary,
            interpreters: script_interpreters(binary),
        }
    }

    pub(crate) fn matches<S: AsRef<OsStr>>(&self, arguments: &[S]) -> bool {
        let Some(program) = arguments.first().map(Path::new) else {
            return false;
        };
        if program == self.binary {
            return true;
        }
        if program.components().count() == 1
            && self
                .binary
                .file_name()
                .is_some_and(|name| name == program.as_os_str())
        {
            return true;
        }
        self.runs_as_interpreter(program)
            && arguments
                .get(1)
                .is_some_and(|script| Path::new(script) == self.binary)
    }

    fn runs_as_interpreter(&self, program: &Path) -> bool {
        program
            .file_name()
            .is_some_and(|name| self.interpreters.iter().any(|known| known == name))
    }
}

/// File names of the interpreter and its optional argument from the `#!`
/// line of `binary`. Empty for anything that is not a readable script.
fn script_interpreters(binary: &Path) -> Vec<OsString> {
    let Ok(file) = File::open(binary) else {
        return Vec::new();
    };
    let mut line = Vec::new();
    if BufReader::new(file.take(SHEBANG_LIMIT))
        .read_until(b'\n', &mut line)
        .is_err()
    {
        return Vec::new();
    }
    let Some(directive) = line.strip_prefix(b"#!") else {
        return Vec::new();
    };
    directive
        .split(u8::is_ascii_whitespace)
        .filter(|word| !word.is_empty())
        .take(2)
        .filter_map(|word| Path::new(OsStr::from_bytes(word)).file_name())
        .map(OsStr::to_os_string)
        .collect()
}

fn command_refresh() -> ProcessRefreshKind {
    ProcessRefreshKind::new().with_cmd(UpdateKind::Always)
}

const fn is_defunct(status: ProcessStatus) -> bool {
    matches!(status, ProcessStatus::Zombie | ProcessStatus::Dead)
}

/// Loads a single process entry from the process table.
fn with_process<T>(
    pid: u32,
    refresh: ProcessRefreshKind,
    inspect: impl FnOnce(&Process) -> T,
) -> Option<T> {
    let target = TablePid::from_u32(pid);
    let mut system = System::new();
    if !system.refresh_process_specifics(target, refresh) {
        return None;
    }
    system.process(target).map(inspect)
}

fn is_zombie(pid: u32) -> bool {
    with_process(pid, ProcessRefreshKind::new(), |process| {
        is_defunct(process.status())
    })
    .unwrap_or(false)
}

/// Confirms that `pid` runs `binary`.
pub(crate) fn runs_binary(pid: u32, binary: &Path) -> bool {
    let matcher = CommandMatcher::new(binary);
    with_process(pid, command_refresh(), |process| {
        matcher.matches(process.cmd())
    })
    .unwrap_or(false)
}

/// Finds live instances of `binary`, excluding this controller, lowest pid
/// first.
pub(crate) fn scan_for_binary(binary: &Path) -> Vec<u32> {
    let matcher = CommandMatcher::new(binary);
    let own = std::process::id();
    let mut system = System::new();
    system.refresh_processes_specifics(command_refresh());
    let mut found: Vec<u32> = system
        .processes()
        .values()
        .filter(|process| !is_defunct(process.status()))
        .filter(|process| matcher.matches(process.cmd()))
        .map(|process| process.pid().as_u32())
        .filter(|pid| *pid != own)
        .collect();
    found.sort_unstable();
    found
}

/// Waits until `pid` has exec'd `binary`; a freshly forked child still
/// carries its parent's command line.
#[cfg(test)]
pub(crate) fn wait_for_exec(pid: u32, binary: &Path) -> bool {
    use std::convert::Infallible;
    use std::time::Duration;

    use super::wait::{BoundedWait, WaitOutcome};

    let wait = BoundedWait::fixed(Duration::from_millis(10), Duration::from_secs(5));
    let outcome: Result<_, Infallible> = wait.poll(|| Ok(runs_binary(pid, binary).then_some(())));
    matches!(outcome, Ok(WaitOutcome::Ready(())))
}

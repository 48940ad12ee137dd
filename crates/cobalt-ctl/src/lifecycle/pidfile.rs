//! Pid file handling.
//!
//! The pid file is only ever a hint: callers corroborate the recorded pid
//! against the live process table before trusting it.

use std::fs;
use std::io::{self, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tempfile::NamedTempFile;
use tracing::debug;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;

#[cfg(unix)]
const PID_FILE_MODE: u32 = 0o644;

fn split_path(path: &Path) -> (PathBuf, &Path) {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path.file_name().map_or(path, Path::new);
    (parent, file_name)
}

/// Reads the pid recorded in `path`.
///
/// A missing file, a missing parent directory, or an empty file yields
/// `Ok(None)`. Unreadable or malformed contents are errors. Only the first
/// whitespace-separated token is considered.
pub(crate) fn read_pid(path: &Path) -> Result<Option<u32>, LifecycleError> {
    let (parent, file_name) = split_path(path);
    let dir = match Dir::open_ambient_dir(&parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LifecycleError::OpenPidDir {
                path: parent,
                source,
            });
        }
    };
    let content = match dir.read_to_string(file_name) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LifecycleError::ReadPid {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let Some(token) = content.split_whitespace().next() else {
        return Ok(None);
    };
    // Zero would address the caller's own process group when signalled.
    token
        .parse::<NonZeroU32>()
        .map(|pid| Some(pid.get()))
        .map_err(|source| LifecycleError::ParsePid {
            path: path.to_path_buf(),
            source,
        })
}

/// Atomically records `pid` in `path`, creating the parent directory first.
pub(crate) fn write_pid(path: &Path, pid: u32) -> Result<(), LifecycleError> {
    let write_error = |source| LifecycleError::WritePid {
        path: path.to_path_buf(),
        source,
    };
    let (parent, _) = split_path(path);
    fs::create_dir_all(&parent).map_err(write_error)?;
    let mut temp = NamedTempFile::new_in(&parent).map_err(write_error)?;
    writeln!(temp, "{pid}").map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(PID_FILE_MODE))
            .map_err(write_error)?;
    }
    temp.persist(path)
        .map_err(|error| write_error(error.error))?;
    debug!(target: LIFECYCLE_TARGET, pid, path = %path.display(), "recorded pid file");
    Ok(())
}

/// Removes the pid file, treating an already-missing file as success.
pub(crate) fn remove_pid(path: &Path) -> Result<(), LifecycleError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(target: LIFECYCLE_TARGET, path = %path.display(), "removed pid file");
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LifecycleError::RemovePid {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Removes the pid file only while it still records `pid`.
///
/// Returns `true` when a file was removed.
pub(crate) fn remove_pid_if_matches(path: &Path, pid: u32) -> Result<bool, LifecycleError> {
    match read_pid(path) {
        Ok(Some(recorded)) if recorded == pid => remove_pid(path).map(|()| true),
        Ok(_) | Err(LifecycleError::ParsePid { .. }) => Ok(false),
        Err(error) => Err(error),
    }
}

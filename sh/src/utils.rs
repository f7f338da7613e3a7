//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::shell::environment::Environment;
use crate::shell::opened_files::{OpenedFile, OpenedFiles};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::WaitStatus;
use nix::unistd::{ForkResult, Pid};
use std::convert::Infallible;
use std::ffi::{CString, OsStr, OsString};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

// descriptors below this value are left to redirections
const FIRST_PRIVATE_FD: RawFd = 10;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("internal call to {command} failed ({errno})")]
pub struct OsError {
    pub command: &'static str,
    pub errno: Errno,
}

impl OsError {
    fn new(command: &'static str, errno: Errno) -> Self {
        Self { command, errno }
    }
}

pub type OsResult<T> = Result<T, OsError>;

/// Writes out anything buffered in the standard streams, so that it is not
/// duplicated in a child process or lost on exit
pub fn flush_std_streams() {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
}

pub fn fork() -> OsResult<ForkResult> {
    flush_std_streams();
    // fork in general is not safe for multithreaded programs, but the shell
    // is single threaded, so this is safe
    unsafe { nix::unistd::fork() }.map_err(|errno| OsError::new("fork", errno))
}

pub fn pipe() -> OsResult<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe().map_err(|errno| OsError::new("pipe", errno))
}

pub fn dup2(old_fd: RawFd, new_fd: RawFd) -> OsResult<RawFd> {
    nix::unistd::dup2(old_fd, new_fd).map_err(|errno| OsError::new("dup2", errno))
}

pub fn close(fd: RawFd) -> OsResult<()> {
    nix::unistd::close(fd).map_err(|errno| OsError::new("close", errno))
}

pub fn signal_to_exit_status(signal: nix::sys::signal::Signal) -> i32 {
    128 + signal as i32
}

/// Waits for `pid` to terminate and returns its exit status
pub fn wait_child_process(pid: Pid) -> OsResult<i32> {
    loop {
        match nix::sys::wait::waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, status)) => return Ok(status),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(signal_to_exit_status(signal)),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(errno) => return Err(OsError::new("waitpid", errno)),
        }
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

/// Searches `env_path` for `command`. Executable files are preferred,
/// the first regular file is returned otherwise so that executing it reports
/// the permission error.
pub fn find_in_path(command: &str, env_path: &str) -> Option<OsString> {
    let mut first_file = None;
    for dir in env_path.split(':') {
        let mut command_path = if dir.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(dir)
        };
        command_path.push(command);
        if is_executable(&command_path) {
            return Some(command_path.into_os_string());
        }
        if first_file.is_none() && command_path.is_file() {
            first_file = Some(command_path.into_os_string());
        }
    }
    first_file
}

pub fn find_command(command: &str, env_path: &str) -> Option<OsString> {
    if command.contains('/') {
        let path = PathBuf::from(command);
        if path.exists() {
            Some(path.into_os_string())
        } else {
            None
        }
    } else {
        find_in_path(command, env_path)
    }
}

#[derive(Debug)]
pub enum ExecError {
    OsError(OsError),
    CannotExecute(Errno),
}

impl From<OsError> for ExecError {
    fn from(value: OsError) -> Self {
        Self::OsError(value)
    }
}

fn to_cstring<S: AsRef<OsStr>>(s: S) -> Result<CString, ExecError> {
    CString::new(s.as_ref().as_bytes()).map_err(|_| ExecError::CannotExecute(Errno::EINVAL))
}

/// Makes the descriptors of the current process match `opened_files`
pub fn apply_opened_files(opened_files: &OpenedFiles) -> OsResult<()> {
    let mut targets = opened_files
        .opened_files
        .iter()
        .map(|(fd, file)| (*fd as RawFd, file))
        .collect::<Vec<_>>();
    targets.sort_by_key(|(fd, _)| *fd);

    // every source is copied above all targets before any descriptor is
    // replaced, so that a source cannot be overwritten by an earlier dup2
    // (`2>&1 >file`, `4>a 3>b`)
    let first_private_fd = targets
        .last()
        .map_or(FIRST_PRIVATE_FD, |(fd, _)| FIRST_PRIVATE_FD.max(fd + 1));
    let mut plan = Vec::with_capacity(targets.len());
    for (fd, file) in targets {
        let src = match file {
            OpenedFile::Stdin => libc::STDIN_FILENO,
            OpenedFile::Stdout => libc::STDOUT_FILENO,
            OpenedFile::Stderr => libc::STDERR_FILENO,
            OpenedFile::ReadFile(f) | OpenedFile::WriteFile(f) | OpenedFile::ReadWriteFile(f) => {
                f.as_raw_fd()
            }
        };
        if src == fd {
            // opened files are close-on-exec, the flag has to be cleared
            // when the file already sits on its target
            fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))
                .map_err(|errno| OsError::new("fcntl", errno))?;
            continue;
        }
        let copy = fcntl(src, FcntlArg::F_DUPFD_CLOEXEC(first_private_fd))
            .map_err(|errno| OsError::new("fcntl", errno))?;
        plan.push((copy, fd));
    }
    for (copy, dest) in &plan {
        dup2(*copy, *dest)?;
    }
    for (copy, _) in plan {
        close(copy)?;
    }
    for standard_fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if opened_files.get_file(standard_fd as u32).is_none() {
            // closing an already closed descriptor is not an error here
            let _ = nix::unistd::close(standard_fd);
        }
    }
    Ok(())
}

/// Restores the default disposition of the signals the Rust runtime
/// ignores, so that executed programs start with the usual defaults
pub fn reset_signal_dispositions() -> OsResult<()> {
    // SAFETY: installing the default handler does not run any code in
    // this process
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) }
        .map_err(|errno| OsError::new("signal", errno))?;
    Ok(())
}

/// Replaces the current process with `command`. Only returns on failure.
pub fn exec(
    command: &OsStr,
    args: &[String],
    opened_files: &OpenedFiles,
    env: &Environment,
) -> Result<Infallible, ExecError> {
    apply_opened_files(opened_files)?;
    reset_signal_dispositions()?;
    let command = to_cstring(command)?;
    let args = args.iter().map(to_cstring).collect::<Result<Vec<_>, _>>()?;
    let env = env
        .exported()
        .map(|(name, value)| to_cstring(format!("{name}={value}")))
        .collect::<Result<Vec<_>, _>>()?;
    nix::unistd::execve(&command, &args, &env).map_err(ExecError::CannotExecute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_command_with_slash_is_not_searched() {
        assert_eq!(find_command("/bin/sh", ""), Some(OsString::from("/bin/sh")));
        assert_eq!(find_command("./does-not-exist", DEFAULT_PATH), None);
    }

    #[test]
    fn find_command_in_path() {
        assert_eq!(
            find_in_path("sh", "/nonexistent:/bin"),
            Some(OsString::from("/bin/sh"))
        );
        assert_eq!(find_in_path("does-not-exist-anywhere", DEFAULT_PATH), None);
    }

    #[test]
    fn signal_exit_status() {
        assert_eq!(
            signal_to_exit_status(nix::sys::signal::Signal::SIGKILL),
            137
        );
    }
}

//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::command::{IORedirectionKind, Redirection};
use crate::shell::{CommandExecutionError, Shell};
use crate::wordexp::expand_word_to_string;
use nix::errno::Errno;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::rc::Rc;

pub const STDIN_FILENO: u32 = libc::STDIN_FILENO as u32;
pub const STDOUT_FILENO: u32 = libc::STDOUT_FILENO as u32;
pub const STDERR_FILENO: u32 = libc::STDERR_FILENO as u32;

pub type RedirectionResult = Result<(), CommandExecutionError>;

/// What a file descriptor refers to for the command being executed.
/// `Stdin`, `Stdout` and `Stderr` are the standard streams of the shell itself.
#[derive(Clone, Debug)]
pub enum OpenedFile {
    Stdin,
    Stdout,
    Stderr,
    ReadFile(Rc<File>),
    WriteFile(Rc<File>),
    ReadWriteFile(Rc<File>),
}

impl OpenedFile {
    fn is_readable(&self) -> bool {
        matches!(
            self,
            OpenedFile::Stdin | OpenedFile::ReadFile(_) | OpenedFile::ReadWriteFile(_)
        )
    }

    fn is_writable(&self) -> bool {
        !matches!(self, OpenedFile::Stdin | OpenedFile::ReadFile(_))
    }
}

fn io_err_to_redirection_err(target: &str, err: std::io::Error) -> CommandExecutionError {
    let errno = Errno::from_raw(err.raw_os_error().unwrap_or(0));
    CommandExecutionError::RedirectionError(format!("{target}: {}", errno.desc()))
}

/// File descriptor table of a command, applied to the process before `exec`.
#[derive(Clone, Debug)]
pub struct OpenedFiles {
    pub opened_files: HashMap<u32, OpenedFile>,
}

impl OpenedFiles {
    fn io_redirect(&mut self, kind: IORedirectionKind, target: &str, fd: u32) -> RedirectionResult {
        let mut options = File::options();
        let opened_file = match kind {
            IORedirectionKind::RedirectOutput
            | IORedirectionKind::RedirectOutputClobber
            | IORedirectionKind::RedirectOutputAppend => {
                let append = kind == IORedirectionKind::RedirectOutputAppend;
                let file = options
                    .write(true)
                    .truncate(!append)
                    .append(append)
                    .create(true)
                    .open(target)
                    .map_err(|err| io_err_to_redirection_err(target, err))?;
                OpenedFile::WriteFile(Rc::new(file))
            }
            IORedirectionKind::RedirectInput => {
                let file = options
                    .read(true)
                    .open(target)
                    .map_err(|err| io_err_to_redirection_err(target, err))?;
                OpenedFile::ReadFile(Rc::new(file))
            }
            IORedirectionKind::OpenRW => {
                let file = options
                    .read(true)
                    .write(true)
                    .create(true)
                    .open(target)
                    .map_err(|err| io_err_to_redirection_err(target, err))?;
                OpenedFile::ReadWriteFile(Rc::new(file))
            }
            IORedirectionKind::DuplicateOutput | IORedirectionKind::DuplicateInput => {
                if target == "-" {
                    self.opened_files.remove(&fd);
                    return Ok(());
                }
                let source_fd = target.parse::<u32>().map_err(|_| {
                    CommandExecutionError::RedirectionError(format!("{target}: ambiguous redirect"))
                })?;
                let duplicate_input = kind == IORedirectionKind::DuplicateInput;
                match self.opened_files.get(&source_fd) {
                    Some(file) if duplicate_input && !file.is_readable() => {
                        return Err(CommandExecutionError::RedirectionError(format!(
                            "{source_fd}: Bad file descriptor"
                        )));
                    }
                    Some(file) if !duplicate_input && !file.is_writable() => {
                        return Err(CommandExecutionError::RedirectionError(format!(
                            "{source_fd}: Bad file descriptor"
                        )));
                    }
                    Some(file) => file.clone(),
                    None => {
                        return Err(CommandExecutionError::RedirectionError(format!(
                            "{source_fd}: Bad file descriptor"
                        )));
                    }
                }
            }
        };
        self.opened_files.insert(fd, opened_file);
        Ok(())
    }

    /// Applies `redirections` in order, later redirections of the same
    /// descriptor override earlier ones.
    pub fn redirect(
        &mut self,
        redirections: &[Redirection],
        shell: &mut Shell,
    ) -> RedirectionResult {
        for redir in redirections {
            let target = expand_word_to_string(&redir.file, shell)?;
            self.io_redirect(redir.kind, &target, redir.target_fd())?;
            log::trace!("redirection {redir} applied, target `{target}`");
        }
        Ok(())
    }

    fn write_file(&self, fileno: u32, contents: &str) {
        let result = match self.opened_files.get(&fileno) {
            Some(OpenedFile::Stdout) => std::io::stdout().write_all(contents.as_bytes()),
            Some(OpenedFile::Stderr) => std::io::stderr().write_all(contents.as_bytes()),
            Some(OpenedFile::WriteFile(file)) | Some(OpenedFile::ReadWriteFile(file)) => {
                file.as_ref().write_all(contents.as_bytes())
            }
            // closed or opened for reading only
            _ => Ok(()),
        };
        if let Err(err) = result {
            log::debug!("failed to write to file descriptor {fileno}: {err}");
        }
    }

    pub fn write_out<S: AsRef<str>>(&self, string: S) {
        self.write_file(STDOUT_FILENO, string.as_ref());
    }

    pub fn write_err<S: AsRef<str>>(&self, string: S) {
        self.write_file(STDERR_FILENO, string.as_ref());
    }

    pub fn get_file(&self, fileno: u32) -> Option<&OpenedFile> {
        self.opened_files.get(&fileno)
    }
}

impl Default for OpenedFiles {
    fn default() -> Self {
        let opened_files = HashMap::from([
            (STDIN_FILENO, OpenedFile::Stdin),
            (STDOUT_FILENO, OpenedFile::Stdout),
            (STDERR_FILENO, OpenedFile::Stderr),
        ]);
        Self { opened_files }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::word::test_utils::unquoted_literal;

    fn redirection(fd: Option<u32>, kind: IORedirectionKind, file: &str) -> Redirection {
        Redirection {
            file_descriptor: fd,
            kind,
            file: unquoted_literal(file),
        }
    }

    fn redirect(redirections: &[Redirection]) -> Result<OpenedFiles, CommandExecutionError> {
        let mut shell = Shell::default();
        let mut opened_files = OpenedFiles::default();
        opened_files.redirect(redirections, &mut shell)?;
        Ok(opened_files)
    }

    #[test]
    fn duplicate_uses_the_table_at_the_time_of_the_redirection() {
        let opened_files = redirect(&[
            redirection(Some(2), IORedirectionKind::DuplicateOutput, "1"),
            redirection(None, IORedirectionKind::RedirectOutput, "/dev/null"),
        ])
        .expect("redirection failed");
        assert!(matches!(
            opened_files.get_file(STDERR_FILENO),
            Some(OpenedFile::Stdout)
        ));
        assert!(matches!(
            opened_files.get_file(STDOUT_FILENO),
            Some(OpenedFile::WriteFile(_))
        ));
    }

    #[test]
    fn later_redirections_override_earlier_ones() {
        let opened_files = redirect(&[
            redirection(None, IORedirectionKind::RedirectOutput, "/dev/null"),
            redirection(Some(1), IORedirectionKind::DuplicateOutput, "2"),
        ])
        .expect("redirection failed");
        assert!(matches!(
            opened_files.get_file(STDOUT_FILENO),
            Some(OpenedFile::Stderr)
        ));
    }

    #[test]
    fn close_descriptor() {
        let opened_files = redirect(&[redirection(
            None,
            IORedirectionKind::DuplicateInput,
            "-",
        )])
        .expect("redirection failed");
        assert!(opened_files.get_file(STDIN_FILENO).is_none());
    }

    #[test]
    fn duplicating_a_closed_descriptor_fails() {
        let err = redirect(&[redirection(
            None,
            IORedirectionKind::DuplicateOutput,
            "7",
        )])
        .unwrap_err();
        assert_eq!(err.to_string(), "7: Bad file descriptor");
    }

    #[test]
    fn opening_a_missing_file_fails() {
        let err = redirect(&[redirection(
            None,
            IORedirectionKind::RedirectInput,
            "/nonexistent/file",
        )])
        .unwrap_err();
        assert_eq!(err.to_string(), "/nonexistent/file: No such file or directory");
    }
}

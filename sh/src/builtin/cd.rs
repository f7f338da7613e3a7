//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::builtin::{BuiltinResult, BuiltinUtility};
use crate::shell::opened_files::OpenedFiles;
use crate::shell::Shell;

#[derive(Debug, PartialEq, Eq)]
enum CdArgs<'a> {
    ChangeDir { directory: Option<&'a str> },
    GoBack,
}

impl<'a> CdArgs<'a> {
    fn parse(args: &'a [String]) -> Result<Self, String> {
        let mut operands = args;
        while let Some(arg) = operands.first() {
            match arg.as_str() {
                "--" => {
                    operands = &operands[1..];
                    break;
                }
                // symbolic links are always resolved
                "-L" | "-P" | "-LP" | "-PL" => operands = &operands[1..],
                _ => break,
            }
        }
        match operands {
            [] => Ok(CdArgs::ChangeDir { directory: None }),
            [dir] if dir == "-" => Ok(CdArgs::GoBack),
            [dir] => Ok(CdArgs::ChangeDir {
                directory: Some(dir.as_str()),
            }),
            _ => Err("cd: too many arguments".to_string()),
        }
    }
}

fn change_directory(shell: &mut Shell, dir: &str) -> BuiltinResult {
    let old_working_dir = std::env::current_dir()
        .map(|dir| dir.to_string_lossy().into_owned())
        .ok();
    nix::unistd::chdir(dir).map_err(|errno| format!("cd: {dir}: {}", errno.desc()))?;
    let new_working_dir = std::env::current_dir()
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_else(|_| dir.to_string());
    shell.assign_global("PWD".to_string(), new_working_dir)?;
    if let Some(old_working_dir) = old_working_dir {
        shell.assign_global("OLDPWD".to_string(), old_working_dir)?;
    }
    Ok(0)
}

pub struct Cd;

impl BuiltinUtility for Cd {
    fn exec(
        &self,
        args: &[String],
        shell: &mut Shell,
        opened_files: &mut OpenedFiles,
    ) -> BuiltinResult {
        match CdArgs::parse(args)? {
            CdArgs::ChangeDir { directory } => {
                let dir = match directory {
                    Some(dir) => dir.to_string(),
                    None => match shell.environment.get_str_value("HOME") {
                        Some(home) if !home.is_empty() => home.to_string(),
                        _ => return Err("cd: HOME not set".into()),
                    },
                };
                change_directory(shell, &dir)
            }
            CdArgs::GoBack => {
                let Some(oldpwd) = shell
                    .environment
                    .get_str_value("OLDPWD")
                    .map(|s| s.to_string())
                else {
                    return Err("cd: OLDPWD not set".into());
                };
                change_directory(shell, &oldpwd)?;
                opened_files.write_out(format!("{oldpwd}\n"));
                Ok(0)
            }
        }
    }
}

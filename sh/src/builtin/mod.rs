//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::builtin::cd::Cd;
use crate::builtin::control_flow::{Break, Continue, Return};
use crate::builtin::exit::Exit;
use crate::builtin::export::Export;
use crate::builtin::readonly::ReadOnly;
use crate::builtin::shift::Shift;
use crate::builtin::unset::BuiltinUnset;
use crate::shell::environment::CannotModifyReadonly;
use crate::shell::opened_files::OpenedFiles;
use crate::shell::Shell;
use crate::utils::OsError;
use thiserror::Error;

mod cd;
mod control_flow;
mod exit;
mod export;
mod readonly;
mod shift;
mod unset;

/// Errors of a builtin, reported by the shell as `name: error`
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Readonly(#[from] CannotModifyReadonly),
    #[error(transparent)]
    Os(#[from] OsError),
}

impl From<&str> for BuiltinError {
    fn from(value: &str) -> Self {
        Self::Usage(value.to_string())
    }
}

impl From<String> for BuiltinError {
    fn from(value: String) -> Self {
        Self::Usage(value)
    }
}

pub type BuiltinResult = Result<i32, BuiltinError>;

/// Builtins whose prefix assignments persist after they return, and whose
/// errors abort a non interactive shell
pub trait SpecialBuiltinUtility {
    fn exec(
        &self,
        args: &[String],
        shell: &mut Shell,
        opened_files: &mut OpenedFiles,
    ) -> BuiltinResult;
}

/// Builtins that behave like external utilities
pub trait BuiltinUtility {
    fn exec(
        &self,
        args: &[String],
        shell: &mut Shell,
        opened_files: &mut OpenedFiles,
    ) -> BuiltinResult;
}

/// `:`, `true` and `false` only return a status
struct ConstantStatus(i32);

impl SpecialBuiltinUtility for ConstantStatus {
    fn exec(&self, _: &[String], _: &mut Shell, _: &mut OpenedFiles) -> BuiltinResult {
        Ok(self.0)
    }
}

impl BuiltinUtility for ConstantStatus {
    fn exec(&self, _: &[String], _: &mut Shell, _: &mut OpenedFiles) -> BuiltinResult {
        Ok(self.0)
    }
}

const SPECIAL_BUILTINS: &[(&str, &dyn SpecialBuiltinUtility)] = &[
    (":", &ConstantStatus(0)),
    ("break", &Break),
    ("continue", &Continue),
    ("exit", &Exit),
    ("export", &Export),
    ("readonly", &ReadOnly),
    ("return", &Return),
    ("shift", &Shift),
    ("unset", &BuiltinUnset),
];

const REGULAR_BUILTINS: &[(&str, &dyn BuiltinUtility)] = &[
    ("cd", &Cd),
    ("false", &ConstantStatus(1)),
    ("true", &ConstantStatus(0)),
];

pub fn get_special_builtin_utility(name: &str) -> Option<&'static dyn SpecialBuiltinUtility> {
    SPECIAL_BUILTINS
        .iter()
        .find(|(builtin_name, _)| *builtin_name == name)
        .map(|(_, builtin)| *builtin)
}

pub fn get_builtin_utility(name: &str) -> Option<&'static dyn BuiltinUtility> {
    REGULAR_BUILTINS
        .iter()
        .find(|(builtin_name, _)| *builtin_name == name)
        .map(|(_, builtin)| *builtin)
}

fn skip_option_terminator(args: &[String]) -> &[String] {
    match args.split_first() {
        Some((first, rest)) if first == "--" => rest,
        _ => args,
    }
}

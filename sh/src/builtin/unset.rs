//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::builtin::{BuiltinResult, SpecialBuiltinUtility};
use crate::shell::opened_files::OpenedFiles;
use crate::shell::Shell;

pub struct BuiltinUnset;

impl SpecialBuiltinUtility for BuiltinUnset {
    fn exec(&self, args: &[String], shell: &mut Shell, _: &mut OpenedFiles) -> BuiltinResult {
        let mut unset_var = false;
        let mut unset_function = false;
        let mut operands_start = 0;
        for arg in args {
            if arg == "--" {
                operands_start += 1;
                break;
            }
            if !arg.starts_with('-') || arg.len() == 1 {
                break;
            }
            for option in arg[1..].chars() {
                match option {
                    'f' => unset_function = true,
                    'v' => unset_var = true,
                    other => return Err(format!("unset: invalid option -{other}").into()),
                }
            }
            operands_start += 1;
        }
        if unset_var && unset_function {
            return Err("unset: cannot set multiple options".into());
        }

        for name in &args[operands_start..] {
            if unset_function {
                shell.functions.remove(name.as_str());
            } else if shell.environment.unset(name).is_err() {
                return Err(format!("unset: cannot unset readonly variable '{name}'").into());
            }
        }

        Ok(0)
    }
}

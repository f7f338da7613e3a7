//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::builtin::{skip_option_terminator, BuiltinResult, SpecialBuiltinUtility};
use crate::parse::command_parser::is_valid_name;
use crate::shell::environment::Value;
use crate::shell::opened_files::OpenedFiles;
use crate::shell::Shell;

/// Splits `name=value` operands, checking that `name` is a valid variable name
pub(super) fn parse_assignment_operand(
    builtin: &str,
    arg: &str,
) -> Result<(String, Option<String>), String> {
    let (name, value) = match arg.split_once('=') {
        Some((name, value)) => (name, Some(value.to_string())),
        None => (arg, None),
    };
    if !is_valid_name(name) {
        return Err(format!("{builtin}: '{name}' is not a valid name"));
    }
    Ok((name.to_string(), value))
}

/// Writes the variables selected by `filter` sorted by name, in a format
/// that can be read back by the shell
pub(super) fn print_variables(
    builtin: &str,
    shell: &Shell,
    opened_files: &OpenedFiles,
    filter: fn(&Value) -> bool,
) {
    let mut pairs = shell
        .environment
        .global_scope()
        .iter()
        .filter(|(_, val)| filter(val))
        .collect::<Vec<_>>();
    pairs.sort_by_key(|(k, _)| k.as_str());
    for (var, var_value) in pairs {
        if let Some(val) = &var_value.value {
            opened_files.write_out(format!("{builtin} {var}='{}'\n", val.replace('\'', "'\\''")));
        } else {
            opened_files.write_out(format!("{builtin} {var}\n"));
        }
    }
}

pub struct Export;

impl SpecialBuiltinUtility for Export {
    fn exec(
        &self,
        args: &[String],
        shell: &mut Shell,
        opened_files: &mut OpenedFiles,
    ) -> BuiltinResult {
        if args.first().is_some_and(|arg| arg == "-p") {
            if args.len() > 1 && !(args.len() == 2 && args[1] == "--") {
                return Err("export: too many arguments".into());
            }
            print_variables("export", shell, opened_files, |val| val.export);
            return Ok(0);
        }

        let args = skip_option_terminator(args);
        if args.is_empty() {
            print_variables("export", shell, opened_files, |val| val.export);
            return Ok(0);
        }

        for arg in args {
            match parse_assignment_operand("export", arg)? {
                (name, Some(value)) => shell.assign_global(name, value)?.export = true,
                (name, None) => shell.environment.promote_local_or_get_global(name).export = true,
            }
        }
        Ok(0)
    }
}

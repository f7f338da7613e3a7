//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::builtin::export::{parse_assignment_operand, print_variables};
use crate::builtin::{skip_option_terminator, BuiltinResult, SpecialBuiltinUtility};
use crate::shell::opened_files::OpenedFiles;
use crate::shell::Shell;

pub struct ReadOnly;

impl SpecialBuiltinUtility for ReadOnly {
    fn exec(
        &self,
        args: &[String],
        shell: &mut Shell,
        opened_files: &mut OpenedFiles,
    ) -> BuiltinResult {
        if args.first().is_some_and(|arg| arg == "-p") {
            if args.len() > 1 && !(args.len() == 2 && args[1] == "--") {
                return Err("readonly: too many arguments".into());
            }
            print_variables("readonly", shell, opened_files, |val| val.readonly);
            return Ok(0);
        }

        let args = skip_option_terminator(args);
        if args.is_empty() {
            print_variables("readonly", shell, opened_files, |val| val.readonly);
            return Ok(0);
        }

        for arg in args {
            match parse_assignment_operand("readonly", arg)? {
                (name, Some(value)) => shell.assign_global(name, value)?.readonly = true,
                (name, None) => {
                    shell.environment.promote_local_or_get_global(name).readonly = true
                }
            }
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readonly_variable_keeps_its_value() {
        let mut shell = Shell::default();
        let args = vec!["A=1".to_string()];
        assert!(matches!(
            ReadOnly.exec(&args, &mut shell, &mut OpenedFiles::default()),
            Ok(0)
        ));
        assert!(shell
            .environment
            .set("A".to_string(), "2".to_string())
            .is_err());
        assert_eq!(shell.environment.get_str_value("A"), Some("1"));
    }
}

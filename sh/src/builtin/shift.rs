//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::builtin::{skip_option_terminator, BuiltinResult, SpecialBuiltinUtility};
use crate::shell::opened_files::OpenedFiles;
use crate::shell::Shell;

pub struct Shift;

impl SpecialBuiltinUtility for Shift {
    fn exec(&self, args: &[String], shell: &mut Shell, _: &mut OpenedFiles) -> BuiltinResult {
        let args = skip_option_terminator(args);
        if args.len() > 1 {
            return Err("shift: too many arguments".into());
        }

        let n = match args.first() {
            Some(n) => n
                .parse::<usize>()
                .map_err(|_| "shift: positive numeric argument required")?,
            None => 1,
        };
        if n > shell.positional_parameters.len() {
            return Err("shift: count out of range".into());
        }

        shell.positional_parameters.drain(..n);
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_with_parameters(params: &[&str]) -> Shell {
        let mut shell = Shell::default();
        shell.positional_parameters = params.iter().map(|s| s.to_string()).collect();
        shell
    }

    #[test]
    fn shift_removes_leading_parameters() {
        let mut shell = shell_with_parameters(&["a", "b", "c"]);
        assert!(matches!(
            Shift.exec(&["2".to_string()], &mut shell, &mut OpenedFiles::default()),
            Ok(0)
        ));
        assert_eq!(shell.positional_parameters, vec!["c".to_string()]);
    }

    #[test]
    fn shift_out_of_range_keeps_parameters() {
        let mut shell = shell_with_parameters(&["a"]);
        assert!(Shift
            .exec(&["2".to_string()], &mut shell, &mut OpenedFiles::default())
            .is_err());
        assert_eq!(shell.positional_parameters, vec!["a".to_string()]);
    }
}

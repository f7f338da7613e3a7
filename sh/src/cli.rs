//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::error::{Error, GetExitCode};
use crate::shell::Shell;
use crate::utils::flush_std_streams;
use std::io::Read;
use std::path::Path;

const DEFAULT_PROGRAM_NAME: &str = "minish";

/// minish - a POSIX-style shell command interpreter
#[derive(Debug, clap::Parser, Clone, Default)]
#[command(version)]
pub struct Args {
    /// Execute COMMAND_STRING. The first operand is assigned to $0 and the
    /// others to the positional parameters.
    #[arg(short = 'c', value_name = "COMMAND_STRING")]
    pub command_string: Option<String>,

    /// Read commands from standard input. The operands are assigned to the
    /// positional parameters.
    #[arg(short = 's')]
    pub read_from_stdin: bool,

    /// Script file followed by its arguments, or the arguments of COMMAND_STRING
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub operands: Vec<String>,
}

enum ProgramSource {
    CommandString(String),
    Stdin,
    Script(String),
}

impl Args {
    /// Splits the arguments into where the program comes from, `$0` and the
    /// positional parameters
    fn into_parts(self) -> (ProgramSource, String, Vec<String>) {
        let mut operands = self.operands.into_iter();
        if let Some(command_string) = self.command_string {
            let program_name = operands
                .next()
                .unwrap_or_else(|| DEFAULT_PROGRAM_NAME.to_string());
            (
                ProgramSource::CommandString(command_string),
                program_name,
                operands.collect(),
            )
        } else if self.read_from_stdin || operands.len() == 0 {
            (
                ProgramSource::Stdin,
                DEFAULT_PROGRAM_NAME.to_string(),
                operands.collect(),
            )
        } else {
            let script = operands.next().unwrap_or_default();
            (ProgramSource::Script(script.clone()), script, operands.collect())
        }
    }
}

fn read_stdin() -> crate::error::Result<String> {
    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|source| Error::Io {
            path: "stdin".to_string(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Executes the program described by `args` and returns the exit status
/// of the shell.
pub fn run(args: Args) -> i32 {
    let (source, program_name, positional_parameters) = args.into_parts();
    let mut shell = Shell::initialize_from_system(program_name.clone(), positional_parameters);
    log::debug!("starting {program_name} with {:?}", shell.positional_parameters);

    // syntax errors in a command string are attributed to `-c`
    let syntax_error_prefix = match &source {
        ProgramSource::CommandString(_) => format!("{program_name}: -c: "),
        _ => format!("{program_name}: "),
    };
    let result = match source {
        ProgramSource::CommandString(command_string) => shell
            .execute_program(&command_string)
            .map_err(Error::from),
        ProgramSource::Stdin => {
            read_stdin().and_then(|program| shell.execute_program(&program).map_err(Error::from))
        }
        ProgramSource::Script(script) => shell.execute_script(Path::new(&script)),
    };

    match &result {
        Err(Error::Syntax(err)) => eprint!("{}", err.report(&syntax_error_prefix)),
        Err(err) => eprintln!("{program_name}: {err}"),
        Ok(_) => {}
    }
    flush_std_streams();
    result.get_exit_code()
}

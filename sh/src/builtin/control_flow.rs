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
use crate::shell::{ControlFlowState, Shell};

fn loop_control_flow(
    args: &[String],
    shell: &mut Shell,
    name: &str,
    state: fn(u32) -> ControlFlowState,
) -> BuiltinResult {
    if shell.loop_depth == 0 {
        return Err(format!(
            "{name}: '{name}' can only be used inside 'for', 'while' and 'until' loops"
        )
        .into());
    }

    let args = skip_option_terminator(args);
    if args.len() > 1 {
        return Err(format!("{name}: too many arguments").into());
    }
    let n = match args.first() {
        Some(n) => n
            .parse::<i32>()
            .map_err(|_| format!("{name}: expected numeric argument"))?,
        None => 1,
    };
    if n < 1 {
        return Err(format!("{name}: argument has to be bigger than 0").into());
    }

    // breaking out of more loops than there are exits the outermost one
    shell.control_flow_state = state(shell.loop_depth.min(n as u32));
    Ok(0)
}

pub struct Break;

impl SpecialBuiltinUtility for Break {
    fn exec(&self, args: &[String], shell: &mut Shell, _: &mut OpenedFiles) -> BuiltinResult {
        loop_control_flow(args, shell, "break", ControlFlowState::Break)
    }
}

pub struct Continue;

impl SpecialBuiltinUtility for Continue {
    fn exec(&self, args: &[String], shell: &mut Shell, _: &mut OpenedFiles) -> BuiltinResult {
        loop_control_flow(args, shell, "continue", ControlFlowState::Continue)
    }
}

pub struct Return;

impl SpecialBuiltinUtility for Return {
    fn exec(&self, args: &[String], shell: &mut Shell, _: &mut OpenedFiles) -> BuiltinResult {
        if shell.function_call_depth == 0 {
            return Err("return: 'return' can only be used inside a function".into());
        }
        let args = skip_option_terminator(args);
        if args.len() > 1 {
            return Err("return: too many arguments".into());
        }
        let status = match args.first() {
            Some(n) => {
                n.parse::<i32>()
                    .map_err(|_| "return: expected numeric argument")?
                    & 0xFF
            }
            None => shell.last_pipeline_exit_status,
        };
        shell.control_flow_state = ControlFlowState::Return;
        Ok(status)
    }
}

//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

pub struct TestPlan {
    pub cmd: String,
    pub args: Vec<String>,
    pub stdin_data: String,
    pub expected_out: String,
    pub expected_err: String,
    pub expected_exit_code: i32,
}

/// Shells tried, in order, by [`run_reference_shell`]
pub const REFERENCE_SHELLS: &[&str] = &["/bin/bash", "/usr/bin/bash"];

fn workspace_binary(cmd: &str) -> PathBuf {
    let relpath = if cfg!(debug_assertions) {
        format!("target/debug/{}", cmd)
    } else {
        format!("target/release/{}", cmd)
    };
    // Move up to the workspace root from the current package directory
    std::env::current_dir()
        .expect("failed to get current directory")
        .parent()
        .expect("package directory has no parent")
        .join(relpath)
}

fn spawn_and_wait(mut command: Command, stdin_data: &[u8]) -> Output {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .unwrap_or_else(|err| panic!("failed to spawn {:?}: {err}", command.get_program()));

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(stdin_data) {
            eprintln!("Error writing to stdin: {}", e);
        }
        // Explicitly drop stdin to close the pipe
        drop(stdin);
    }

    child.wait_with_output().expect("failed to wait for child")
}

/// Run a workspace binary with environment variables
pub fn run_test_base_with_env(
    cmd: &str,
    args: &Vec<String>,
    stdin_data: &[u8],
    env_vars: &[(&str, &str)],
) -> Output {
    let mut command = Command::new(workspace_binary(cmd));
    command.args(args);
    for (key, value) in env_vars {
        command.env(key, value);
    }
    spawn_and_wait(command, stdin_data)
}

/// Run a workspace binary (without custom environment variables)
pub fn run_test_base(cmd: &str, args: &Vec<String>, stdin_data: &[u8]) -> Output {
    run_test_base_with_env(cmd, args, stdin_data, &[])
}

fn check_output(plan: &TestPlan, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, plan.expected_out);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr, plan.expected_err);

    assert_eq!(output.status.code(), Some(plan.expected_exit_code));
    if plan.expected_exit_code == 0 {
        assert!(output.status.success());
    }
}

pub fn run_test(plan: TestPlan) {
    let output = run_test_base(&plan.cmd, &plan.args, plan.stdin_data.as_bytes());
    check_output(&plan, &output);
}

pub fn run_test_with_checker<F: FnMut(&TestPlan, &Output)>(plan: TestPlan, mut checker: F) {
    let output = run_test_base(&plan.cmd, &plan.args, plan.stdin_data.as_bytes());
    checker(&plan, &output);
}

/// Path of the first installed reference shell, if any
pub fn reference_shell() -> Option<&'static str> {
    REFERENCE_SHELLS
        .iter()
        .copied()
        .find(|path| Path::new(path).is_file())
}

/// Run `args` through a reference shell installed on the system.
///
/// Returns `None` when no reference shell is available, so that differential
/// tests can be skipped.
pub fn run_reference_shell(args: &[String], stdin_data: &[u8]) -> Option<Output> {
    let shell = reference_shell()?;
    let mut command = Command::new(shell);
    command.args(args);
    Some(spawn_and_wait(command, stdin_data))
}

/// Run the same arguments through the workspace binary `cmd` and through
/// the reference shell, returning both outputs.
pub fn run_differential(
    cmd: &str,
    args: &[String],
    stdin_data: &[u8],
) -> Option<(Output, Output)> {
    let reference = run_reference_shell(args, stdin_data)?;
    let output = run_test_base(cmd, &args.to_vec(), stdin_data);
    Some((output, reference))
}

//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::builtin::{
    get_builtin_utility, get_special_builtin_utility, BuiltinUtility, SpecialBuiltinUtility,
};
use crate::parse::command::{
    Assignment, CaseItem, Command, CommandType, CompleteCommand, CompoundCommand, Conjunction,
    FunctionDefinition, If, LogicalOp, Name, Pipeline, Redirection, SimpleCommand,
};
use crate::parse::word::Word;
use crate::parse::{parse, ParserError};
use crate::shell::environment::{CannotModifyReadonly, Environment, Value};
use crate::shell::opened_files::{OpenedFile, OpenedFiles, STDIN_FILENO, STDOUT_FILENO};
use crate::utils::{
    dup2, exec, find_command, flush_std_streams, fork, pipe, wait_child_process, ExecError,
    OsError, OsResult, DEFAULT_PATH,
};
use crate::wordexp::{expand_word, expand_word_to_string, word_to_pattern};
use nix::errno::Errno;
use nix::unistd::{getpid, getppid, ForkResult, Pid};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

pub mod environment;
pub mod opened_files;

#[derive(Clone, Debug, Error)]
pub enum CommandExecutionError {
    #[error("{0}")]
    RedirectionError(String),
    #[error("{0}")]
    VariableAssignmentError(#[from] CannotModifyReadonly),
    #[error("{0}")]
    ExpansionError(String),
    #[error("{name}: {message}")]
    ParameterError { name: String, message: String },
    #[error("{0}")]
    OsError(#[from] OsError),
}

type CommandExecutionResult<T> = Result<T, CommandExecutionError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlFlowState {
    Break(u32),
    Continue(u32),
    Return,
    None,
}

impl ControlFlowState {
    fn go_to_outer_loop(&mut self) {
        match *self {
            ControlFlowState::Break(1) | ControlFlowState::Continue(1) => {
                *self = ControlFlowState::None
            }
            ControlFlowState::Break(n) => *self = ControlFlowState::Break(n - 1),
            ControlFlowState::Continue(n) => *self = ControlFlowState::Continue(n - 1),
            _ => {}
        }
    }
}

#[derive(Clone)]
pub struct Shell {
    pub environment: Environment,
    pub program_name: String,
    pub positional_parameters: Vec<String>,
    pub opened_files: OpenedFiles,
    pub functions: HashMap<Name, Rc<CompoundCommand>>,
    pub last_pipeline_exit_status: i32,
    pub last_command_substitution_status: i32,
    pub shell_pid: i32,
    pub control_flow_state: ControlFlowState,
    pub loop_depth: u32,
    pub function_call_depth: u32,
    /// line of the command being executed, used in diagnostics
    pub lineno: u32,
}

impl Shell {
    fn error_prefix(&self) -> String {
        format!("{}: line {}: ", self.program_name, self.lineno)
    }

    fn eprint(&self, message: &str) {
        self.opened_files
            .write_err(format!("{}{message}\n", self.error_prefix()));
    }

    pub fn exit(&self, status: i32) -> ! {
        flush_std_streams();
        std::process::exit(status)
    }

    pub fn assign_global(
        &mut self,
        name: String,
        value: String,
    ) -> Result<&mut Value, CannotModifyReadonly> {
        self.environment.set_global(name, value)
    }

    fn handle_error(&mut self, err: CommandExecutionError) -> i32 {
        self.eprint(&err.to_string());
        match err {
            // > If a parameter expansion error or a variable assignment error occurs
            // > in a non-interactive shell, the shell shall exit
            CommandExecutionError::ParameterError { .. } => self.exit(127),
            CommandExecutionError::VariableAssignmentError(_) => self.exit(1),
            CommandExecutionError::OsError(_) => self.exit(1),
            _ => 1,
        }
    }

    /// Runs `path` as a script in the current (child) process. Only called after
    /// `execve` refused the file.
    fn exec_as_script(&mut self, path: &OsStr, args: &[String]) -> i32 {
        let source = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                self.eprint(&format!("{}: {err}", path.to_string_lossy()));
                return 126;
            }
        };
        self.program_name = path.to_string_lossy().into_owned();
        self.positional_parameters = args[1..].to_vec();
        self.functions.clear();
        match self.execute_program(&source) {
            Ok(status) => status,
            Err(err) => {
                self.opened_files
                    .write_err(err.report(&format!("{}: ", self.program_name)));
                2
            }
        }
    }

    fn exec_in_child(
        &mut self,
        command: &OsStr,
        args: &[String],
        opened_files: &OpenedFiles,
    ) -> i32 {
        let name = args[0].as_str();
        if Path::new(command).is_dir() {
            opened_files.write_err(format!("{}{name}: Is a directory\n", self.error_prefix()));
            return 126;
        }
        let errno = match exec(command, args, opened_files, &self.environment) {
            Ok(never) => match never {},
            Err(ExecError::OsError(err)) => {
                opened_files.write_err(format!("{}{err}\n", self.error_prefix()));
                return 1;
            }
            Err(ExecError::CannotExecute(errno)) => errno,
        };
        if errno == Errno::ENOEXEC {
            // descriptors were already applied to the process
            self.opened_files = OpenedFiles::default();
            return self.exec_as_script(command, args);
        }
        opened_files.write_err(format!("{}{name}: {}\n", self.error_prefix(), errno.desc()));
        if errno == Errno::ENOENT {
            127
        } else {
            126
        }
    }

    /// Executes `command` in a child process and waits for it
    pub fn exec(
        &mut self,
        command: &OsStr,
        args: &[String],
        opened_files: &OpenedFiles,
    ) -> OsResult<i32> {
        match fork()? {
            ForkResult::Child => {
                let status = self.exec_in_child(command, args, opened_files);
                self.exit(status)
            }
            ForkResult::Parent { child } => {
                log::debug!("spawned {} as process {child}", command.to_string_lossy());
                let status = wait_child_process(child)?;
                log::debug!("process {child} exited with status {status}");
                Ok(status)
            }
        }
    }

    /// Performs `assignments` in order, each one seeing the previous ones
    fn assign_variables(
        &mut self,
        assignments: &[Assignment],
        local: bool,
    ) -> CommandExecutionResult<()> {
        for assignment in assignments {
            let value = expand_word_to_string(&assignment.value, self)?;
            log::trace!("assigning `{value}` to {}", assignment.name);
            if local {
                self.environment
                    .set_local(assignment.name.to_string(), value)?;
            } else {
                self.environment.set(assignment.name.to_string(), value)?;
            }
        }
        Ok(())
    }

    fn exec_special_builtin(
        &mut self,
        simple_command: &SimpleCommand,
        args: &[String],
        special_builtin_utility: &dyn SpecialBuiltinUtility,
    ) -> CommandExecutionResult<i32> {
        // assignments before special builtins affect the current environment
        self.assign_variables(&simple_command.assignments, false)?;
        let mut opened_files = self.opened_files.clone();
        opened_files.redirect(&simple_command.redirections, self)?;
        match special_builtin_utility.exec(args, self, &mut opened_files) {
            Ok(status) => Ok(status),
            Err(err) => {
                opened_files.write_err(format!("{}{err}\n", self.error_prefix()));
                Ok(1)
            }
        }
    }

    fn exec_function(
        &mut self,
        simple_command: &SimpleCommand,
        expanded_words: &[String],
        function_body: &CompoundCommand,
    ) -> CommandExecutionResult<i32> {
        let mut opened_files = self.opened_files.clone();
        opened_files.redirect(&simple_command.redirections, self)?;

        self.environment.push_scope();
        if let Err(err) = self.assign_variables(&simple_command.assignments, true) {
            self.environment.pop_scope();
            return Err(err);
        }
        std::mem::swap(&mut self.opened_files, &mut opened_files);
        let mut args = expanded_words[1..].to_vec();
        std::mem::swap(&mut args, &mut self.positional_parameters);

        self.function_call_depth += 1;
        let result = self.interpret_compound_command(function_body, &[]);
        if self.control_flow_state == ControlFlowState::Return {
            self.control_flow_state = ControlFlowState::None;
        }
        self.function_call_depth -= 1;

        std::mem::swap(&mut args, &mut self.positional_parameters);
        std::mem::swap(&mut self.opened_files, &mut opened_files);
        self.environment.pop_scope();
        result
    }

    fn exec_builtin_utility(
        &mut self,
        simple_command: &SimpleCommand,
        args: &[String],
        builtin_utility: &dyn BuiltinUtility,
    ) -> CommandExecutionResult<i32> {
        let mut opened_files = self.opened_files.clone();
        opened_files.redirect(&simple_command.redirections, self)?;

        self.environment.push_scope();
        let status = self
            .assign_variables(&simple_command.assignments, true)
            .map(|_| match builtin_utility.exec(args, self, &mut opened_files) {
                Ok(status) => status,
                Err(err) => {
                    opened_files.write_err(format!("{}{err}\n", self.error_prefix()));
                    1
                }
            });
        self.environment.pop_scope();
        status
    }

    fn exec_external_command(
        &mut self,
        simple_command: &SimpleCommand,
        expanded_words: &[String],
    ) -> CommandExecutionResult<i32> {
        let mut opened_files = self.opened_files.clone();
        opened_files.redirect(&simple_command.redirections, self)?;

        self.environment.push_scope();
        let result = self
            .assign_variables(&simple_command.assignments, true)
            .and_then(|_| {
                let name = expanded_words[0].as_str();
                let path = self
                    .environment
                    .get_str_value("PATH")
                    .unwrap_or(DEFAULT_PATH);
                match find_command(name, path) {
                    Some(command) => Ok(self.exec(&command, expanded_words, &opened_files)?),
                    None => {
                        let reason = if name.contains('/') {
                            "No such file or directory"
                        } else {
                            "command not found"
                        };
                        opened_files
                            .write_err(format!("{}{name}: {reason}\n", self.error_prefix()));
                        Ok(127)
                    }
                }
            });
        self.environment.pop_scope();
        result
    }

    fn interpret_simple_command(
        &mut self,
        simple_command: &SimpleCommand,
    ) -> CommandExecutionResult<i32> {
        self.last_command_substitution_status = 0;
        let mut expanded_words = Vec::new();
        for word in &simple_command.words {
            expanded_words.extend(expand_word(word, self)?);
        }

        let Some(command_name) = expanded_words.first() else {
            // no command to execute, perform assignments and redirections
            self.assign_variables(&simple_command.assignments, false)?;
            if !simple_command.redirections.is_empty() {
                let mut opened_files = self.opened_files.clone();
                opened_files.redirect(&simple_command.redirections, self)?;
            }
            return Ok(self.last_command_substitution_status);
        };

        if let Some(special_builtin_utility) = get_special_builtin_utility(command_name) {
            self.exec_special_builtin(simple_command, &expanded_words[1..], special_builtin_utility)
        } else if let Some(function_body) = self.functions.get(command_name.as_str()).cloned() {
            self.exec_function(simple_command, &expanded_words, &function_body)
        } else if let Some(builtin_utility) = get_builtin_utility(command_name) {
            self.exec_builtin_utility(simple_command, &expanded_words[1..], builtin_utility)
        } else {
            self.exec_external_command(simple_command, &expanded_words)
        }
    }

    /// Updates the control flow state at the end of a loop iteration.
    /// Returns true if the loop has to stop.
    fn leave_loop_iteration(&mut self) -> bool {
        match self.control_flow_state {
            ControlFlowState::Break(_) => {
                self.control_flow_state.go_to_outer_loop();
                true
            }
            ControlFlowState::Continue(n) => {
                self.control_flow_state.go_to_outer_loop();
                // `continue n` with n > 1 resumes an outer loop
                n > 1
            }
            ControlFlowState::Return => true,
            ControlFlowState::None => false,
        }
    }

    fn interpret_for_clause(
        &mut self,
        iter_var: &Name,
        iter_words: &[Word],
        body: &CompleteCommand,
    ) -> CommandExecutionResult<i32> {
        let mut items = Vec::new();
        for word in iter_words {
            items.extend(expand_word(word, self)?);
        }

        let mut status = 0;
        self.loop_depth += 1;
        for item in items {
            if let Err(err) = self.environment.set(iter_var.to_string(), item) {
                self.loop_depth -= 1;
                return Err(err.into());
            }
            status = self.interpret(body);
            if self.leave_loop_iteration() {
                break;
            }
        }
        self.loop_depth -= 1;
        Ok(status)
    }

    fn interpret_case_clause(
        &mut self,
        arg: &Word,
        cases: &[CaseItem],
    ) -> CommandExecutionResult<i32> {
        let arg = expand_word_to_string(arg, self)?;
        for case in cases {
            for pattern in &case.pattern {
                let pattern = word_to_pattern(pattern, self)?;
                if pattern.matches(&arg) {
                    return Ok(self.interpret(&case.body));
                }
            }
        }
        Ok(0)
    }

    fn interpret_if_clause(
        &mut self,
        if_chain: &[If],
        else_body: &Option<CompleteCommand>,
    ) -> i32 {
        for if_ in if_chain {
            let condition = self.interpret(&if_.condition);
            if self.control_flow_state != ControlFlowState::None {
                return condition;
            }
            if condition == 0 {
                return self.interpret(&if_.body);
            }
        }
        match else_body {
            Some(else_body) => self.interpret(else_body),
            None => 0,
        }
    }

    /// `while` loops run while the condition succeeds, `until` loops while it fails
    fn interpret_loop_clause(
        &mut self,
        condition: &CompleteCommand,
        body: &CompleteCommand,
        continue_if_zero: bool,
    ) -> i32 {
        let mut status = 0;
        self.loop_depth += 1;
        loop {
            let condition = self.interpret(condition);
            if self.leave_loop_iteration() {
                break;
            }
            if (condition == 0) != continue_if_zero {
                break;
            }
            status = self.interpret(body);
            if self.leave_loop_iteration() {
                break;
            }
        }
        self.loop_depth -= 1;
        status
    }

    fn interpret_subshell(&mut self, commands: &CompleteCommand) -> CommandExecutionResult<i32> {
        match fork()? {
            ForkResult::Child => {
                let status = self.interpret(commands);
                self.exit(status)
            }
            ForkResult::Parent { child } => {
                log::debug!("subshell running as process {child}");
                Ok(wait_child_process(child)?)
            }
        }
    }

    pub fn interpret_compound_command(
        &mut self,
        compound_command: &CompoundCommand,
        redirections: &[Redirection],
    ) -> CommandExecutionResult<i32> {
        let mut prev_opened_files = self.opened_files.clone();
        prev_opened_files.redirect(redirections, self)?;
        std::mem::swap(&mut self.opened_files, &mut prev_opened_files);
        let result = match compound_command {
            CompoundCommand::BraceGroup(command) => Ok(self.interpret(command)),
            CompoundCommand::Subshell(commands) => self.interpret_subshell(commands),
            CompoundCommand::ForClause {
                iter_var,
                words,
                body,
            } => self.interpret_for_clause(iter_var, words, body),
            CompoundCommand::CaseClause { arg, cases } => self.interpret_case_clause(arg, cases),
            CompoundCommand::IfClause {
                if_chain,
                else_body,
            } => Ok(self.interpret_if_clause(if_chain, else_body)),
            CompoundCommand::WhileClause { condition, body } => {
                Ok(self.interpret_loop_clause(condition, body, true))
            }
            CompoundCommand::UntilClause { condition, body } => {
                Ok(self.interpret_loop_clause(condition, body, false))
            }
        };
        std::mem::swap(&mut self.opened_files, &mut prev_opened_files);
        result
    }

    fn define_function(&mut self, definition: &FunctionDefinition) {
        self.functions
            .insert(definition.name.clone(), definition.body.clone());
    }

    fn interpret_command(&mut self, command: &Command) -> i32 {
        self.lineno = command.lineno;
        let execution_result = match &command.type_ {
            CommandType::SimpleCommand(simple_command) => {
                self.interpret_simple_command(simple_command)
            }
            CommandType::CompoundCommand {
                command,
                redirections,
            } => self.interpret_compound_command(command, redirections),
            CommandType::FunctionDefinition(function) => {
                self.define_function(function);
                Ok(0)
            }
        };

        match execution_result {
            Ok(result) => result,
            Err(err) => self.handle_error(err),
        }
    }

    /// Connects the standard streams of a pipeline stage to the pipes
    fn setup_pipeline_stage(
        &mut self,
        input: Option<OwnedFd>,
        output: Option<(OwnedFd, OwnedFd)>,
    ) -> OsResult<()> {
        if let Some(read_end) = input {
            dup2(read_end.as_raw_fd(), libc::STDIN_FILENO)?;
            self.opened_files
                .opened_files
                .insert(STDIN_FILENO, OpenedFile::Stdin);
        }
        if let Some((read_end, write_end)) = output {
            drop(read_end);
            dup2(write_end.as_raw_fd(), libc::STDOUT_FILENO)?;
            self.opened_files
                .opened_files
                .insert(STDOUT_FILENO, OpenedFile::Stdout);
        }
        Ok(())
    }

    fn fork_pipeline(&mut self, commands: &[Command]) -> OsResult<i32> {
        let mut children: Vec<Pid> = Vec::with_capacity(commands.len());
        let mut previous_read: Option<OwnedFd> = None;
        let last = commands.len() - 1;
        for (i, command) in commands.iter().enumerate() {
            let next_pipe = if i < last { Some(pipe()?) } else { None };
            match fork()? {
                ForkResult::Child => {
                    let status = match self.setup_pipeline_stage(previous_read.take(), next_pipe)
                    {
                        Ok(()) => self.interpret_command(command),
                        Err(err) => {
                            self.eprint(&err.to_string());
                            1
                        }
                    };
                    self.exit(status)
                }
                ForkResult::Parent { child } => {
                    children.push(child);
                    // the write end belongs to the stage that was just forked
                    previous_read = next_pipe.map(|(read_end, _)| read_end);
                }
            }
        }
        log::debug!("pipeline running as processes {children:?}");
        let mut status = 0;
        for child in children {
            status = wait_child_process(child)?;
        }
        Ok(status)
    }

    fn interpret_pipeline(&mut self, pipeline: &Pipeline) -> OsResult<i32> {
        let pipeline_exit_status = match pipeline.commands.as_slice() {
            [] => 0,
            [command] => self.interpret_command(command),
            commands => self.fork_pipeline(commands)?,
        };
        self.last_pipeline_exit_status = if pipeline.negate_status {
            (pipeline_exit_status == 0) as i32
        } else {
            pipeline_exit_status
        };
        Ok(self.last_pipeline_exit_status)
    }

    fn interpret_and_or_list(&mut self, list: &Conjunction) -> i32 {
        let mut status = 0;
        let mut previous_op = LogicalOp::None;
        for (pipeline, op) in &list.elements {
            let run = match previous_op {
                LogicalOp::And => status == 0,
                LogicalOp::Or => status != 0,
                LogicalOp::None => true,
            };
            previous_op = *op;
            if !run {
                continue;
            }
            status = match self.interpret_pipeline(pipeline) {
                Ok(status) => status,
                Err(err) => {
                    self.eprint(&err.to_string());
                    self.exit(1)
                }
            };
            if self.control_flow_state != ControlFlowState::None {
                return status;
            }
        }
        status
    }

    pub fn interpret(&mut self, command: &CompleteCommand) -> i32 {
        let mut status = 0;
        for conjunction in &command.commands {
            status = self.interpret_and_or_list(conjunction);
            if self.control_flow_state != ControlFlowState::None {
                return status;
            }
        }
        status
    }

    /// Runs `program` in a child process and returns its standard output,
    /// without trailing newlines.
    pub fn execute_in_subshell(&mut self, program: &str) -> CommandExecutionResult<String> {
        let (read_pipe, write_pipe) = pipe()?;
        match fork()? {
            ForkResult::Child => {
                drop(read_pipe);
                let status = match dup2(write_pipe.as_raw_fd(), libc::STDOUT_FILENO) {
                    Ok(_) => {
                        drop(write_pipe);
                        self.opened_files
                            .opened_files
                            .insert(STDOUT_FILENO, OpenedFile::Stdout);
                        match self.execute_program(program) {
                            Ok(status) => status,
                            Err(err) => {
                                let prefix =
                                    format!("{}: command substitution: ", self.program_name);
                                self.opened_files.write_err(err.report(&prefix));
                                2
                            }
                        }
                    }
                    Err(err) => {
                        self.eprint(&err.to_string());
                        1
                    }
                };
                self.exit(status)
            }
            ForkResult::Parent { child } => {
                drop(write_pipe);
                // the output is read before waiting, the child could block on a full pipe
                let mut output = Vec::new();
                let read_result = File::from(read_pipe).read_to_end(&mut output);
                let status = wait_child_process(child)?;
                log::debug!("command substitution process {child} exited with status {status}");
                read_result.map_err(|err| {
                    CommandExecutionError::ExpansionError(format!(
                        "failed to read command substitution output ({err})"
                    ))
                })?;
                self.last_command_substitution_status = status;
                // `$?` already reflects the substitution in the rest of the command
                self.last_pipeline_exit_status = status;
                let mut output = String::from_utf8_lossy(&output).into_owned();
                let new_len = output.trim_end_matches('\n').len();
                output.truncate(new_len);
                Ok(output)
            }
        }
    }

    /// Parses the whole of `program` and then executes it. Nothing is
    /// executed if `program` contains a syntax error.
    pub fn execute_program(&mut self, program: &str) -> Result<i32, ParserError> {
        let program = parse(program)?;
        log::debug!("parsed program:\n{program}");
        let mut status = 0;
        for command in &program.commands {
            status = self.interpret(command);
            if self.control_flow_state == ControlFlowState::Return {
                self.control_flow_state = ControlFlowState::None;
                break;
            }
        }
        Ok(status)
    }

    /// Reads `path` and executes its contents
    pub fn execute_script(&mut self, path: &Path) -> crate::error::Result<i32> {
        let source = std::fs::read(path).map_err(|source| crate::error::Error::Io {
            path: path.to_string_lossy().into_owned(),
            source,
        })?;
        let status = self.execute_program(&String::from_utf8_lossy(&source))?;
        Ok(status)
    }

    pub fn initialize_from_system(program_name: String, args: Vec<String>) -> Shell {
        // > If a variable is initialized from the environment, it shall be marked for
        // > export immediately
        let mut environment = Environment::from(std::env::vars_os().filter_map(|(k, v)| {
            Some((k.into_string().ok()?, Value::new_exported(v.into_string().ok()?)))
        }));
        environment.set_global_forced("PPID".to_string(), getppid().to_string());
        environment.set_global_if_unset("IFS", " \t\n");
        Shell {
            environment,
            program_name,
            positional_parameters: args,
            shell_pid: getpid().as_raw(),
            ..Default::default()
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell {
            environment: Environment::from([("IFS".to_string(), Value::new(" \t\n".to_string()))]),
            program_name: "minish".to_string(),
            positional_parameters: Vec::default(),
            opened_files: OpenedFiles::default(),
            functions: HashMap::default(),
            last_pipeline_exit_status: 0,
            last_command_substitution_status: 0,
            shell_pid: 0,
            control_flow_state: ControlFlowState::None,
            loop_depth: 0,
            function_call_depth: 0,
            lineno: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn run(program: &str) -> (Shell, i32) {
        let mut shell = Shell::default();
        let status = shell.execute_program(program).expect("syntax error");
        (shell, status)
    }

    fn var(shell: &Shell, name: &str) -> Option<String> {
        shell.environment.get_str_value(name).map(str::to_string)
    }

    #[test]
    fn bare_assignments_are_performed_in_order() {
        let (shell, status) = run("A=1 B=$A");
        assert_eq!(status, 0);
        assert_eq!(var(&shell, "A").as_deref(), Some("1"));
        assert_eq!(var(&shell, "B").as_deref(), Some("1"));
    }

    #[test]
    fn and_or_lists_short_circuit() {
        let (shell, status) = run("false && A=1");
        assert_eq!(status, 1);
        assert_eq!(var(&shell, "A"), None);

        let (shell, status) = run("true || A=1");
        assert_eq!(status, 0);
        assert_eq!(var(&shell, "A"), None);

        let (shell, _) = run("false && A=1 || B=2");
        assert_eq!(var(&shell, "A"), None);
        assert_eq!(var(&shell, "B").as_deref(), Some("2"));

        let (shell, _) = run("false && A=1 && B=2");
        assert_eq!(var(&shell, "B"), None);
    }

    #[test]
    fn negated_pipeline() {
        assert_eq!(run("! false").1, 0);
        assert_eq!(run("! true").1, 1);
    }

    #[test]
    fn function_observes_overlay() {
        let (shell, status) = run("A=3; f() { B=$A; }; A=100 f");
        assert_eq!(status, 0);
        assert_eq!(var(&shell, "A").as_deref(), Some("3"));
        assert_eq!(var(&shell, "B").as_deref(), Some("100"));
    }

    #[test]
    fn function_positional_parameters_are_restored() {
        let mut shell = Shell::default();
        shell.positional_parameters = vec!["outer".to_string()];
        shell
            .execute_program("f() { IN=$1$#; }; f a b; OUT=$1$#")
            .expect("syntax error");
        assert_eq!(var(&shell, "IN").as_deref(), Some("a2"));
        assert_eq!(var(&shell, "OUT").as_deref(), Some("outer1"));
    }

    #[test]
    fn return_status() {
        let (shell, status) = run("f() { return 3; A=1; }; f");
        assert_eq!(status, 3);
        assert_eq!(var(&shell, "A"), None);
        assert_eq!(shell.control_flow_state, ControlFlowState::None);
    }

    #[test]
    fn for_loop_binds_each_field() {
        let (shell, _) = run("for i in a b c; do L=$L$i; done");
        assert_eq!(var(&shell, "L").as_deref(), Some("abc"));
        assert_eq!(var(&shell, "i").as_deref(), Some("c"));
    }

    #[test]
    fn for_loop_over_nothing_has_status_zero() {
        assert_eq!(run("false; for i in $EMPTY; do false; done").1, 0);
    }

    #[test]
    fn break_and_continue() {
        let (shell, _) = run(
            "for i in 1 2 3 4; do case $i in 2) continue;; 4) break;; esac; L=$L$i; done",
        );
        assert_eq!(var(&shell, "L").as_deref(), Some("13"));

        let (shell, _) = run("for i in 1 2; do for j in a b; do L=$L$i$j; continue 2; done; done");
        assert_eq!(var(&shell, "L").as_deref(), Some("1a2a"));

        let (shell, _) = run("for i in 1 2; do for j in a b; do L=$L$i$j; break 2; done; done");
        assert_eq!(var(&shell, "L").as_deref(), Some("1a"));
        assert_eq!(shell.loop_depth, 0);
    }

    #[test]
    fn case_runs_first_matching_arm() {
        let (shell, _) = run("case 4 in 1) A=A;; 2) A=B;; 3|4) A=C;; *) A=D;; esac");
        assert_eq!(var(&shell, "A").as_deref(), Some("C"));
        let (_, status) = run("false; case x in y) ;; esac");
        assert_eq!(status, 0);
    }

    #[test]
    fn if_elif_else() {
        let (shell, _) = run("if false; then A=1; elif true; then A=2; else A=3; fi");
        assert_eq!(var(&shell, "A").as_deref(), Some("2"));
        let (_, status) = run("if false; then true; fi");
        assert_eq!(status, 0);
    }

    #[test]
    fn while_and_until_loops() {
        let mut shell = Shell::default();
        shell.positional_parameters = vec!["a".to_string(), "b".to_string()];
        shell
            .execute_program("while ${1+:} false; do L=$L$1; shift; done")
            .expect("syntax error");
        assert_eq!(var(&shell, "L").as_deref(), Some("ab"));

        let (shell, _) = run("until ${DONE+true} false; do DONE=1; N=x$N; done");
        assert_eq!(var(&shell, "N").as_deref(), Some("x"));
    }

    #[test]
    fn brace_group_runs_in_current_environment() {
        let (shell, _) = run("{ A=1; }");
        assert_eq!(var(&shell, "A").as_deref(), Some("1"));
    }

    #[test]
    fn special_builtin_assignments_persist() {
        let (shell, _) = run("A=1 :");
        assert_eq!(var(&shell, "A").as_deref(), Some("1"));
        let (shell, _) = run("A=1 true");
        assert_eq!(var(&shell, "A"), None);
    }

    #[test]
    fn command_not_found_does_not_abort() {
        let (shell, status) = run("this-command-does-not-exist-anywhere; A=$?");
        assert_eq!(status, 0);
        assert_eq!(var(&shell, "A").as_deref(), Some("127"));
    }

    #[test]
    fn command_substitution_status_is_visible_in_the_same_command() {
        let (shell, status) = run("true; A=$(false)$? B=$?");
        assert_eq!(status, 1);
        assert_eq!(var(&shell, "A").as_deref(), Some("1"));
        assert_eq!(var(&shell, "B").as_deref(), Some("1"));
    }

    #[test]
    fn syntax_error_executes_nothing() {
        let mut shell = Shell::default();
        assert!(shell.execute_program("A=1; if true; then").is_err());
        assert_eq!(var(&shell, "A"), None);
    }

    #[test]
    fn control_flow_state_reaches_outer_loop() {
        let mut state = ControlFlowState::Break(2);
        state.go_to_outer_loop();
        assert_eq!(state, ControlFlowState::Break(1));
        state.go_to_outer_loop();
        assert_eq!(state, ControlFlowState::None);
        let mut state = ControlFlowState::Return;
        state.go_to_outer_loop();
        assert_eq!(state, ControlFlowState::Return);
    }
}

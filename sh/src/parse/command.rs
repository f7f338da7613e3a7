//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::word::Word;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub type Name = Rc<str>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IORedirectionKind {
    // >
    RedirectOutput,
    // >|
    RedirectOutputClobber,
    // >>
    RedirectOutputAppend,
    // >&
    DuplicateOutput,
    // <
    RedirectInput,
    // <&
    DuplicateInput,
    // <>
    OpenRW,
}

impl IORedirectionKind {
    pub fn default_fd(self) -> u32 {
        match self {
            IORedirectionKind::RedirectInput
            | IORedirectionKind::DuplicateInput
            | IORedirectionKind::OpenRW => 0,
            _ => 1,
        }
    }

    fn operator(self) -> &'static str {
        match self {
            IORedirectionKind::RedirectOutput => ">",
            IORedirectionKind::RedirectOutputClobber => ">|",
            IORedirectionKind::RedirectOutputAppend => ">>",
            IORedirectionKind::DuplicateOutput => ">&",
            IORedirectionKind::RedirectInput => "<",
            IORedirectionKind::DuplicateInput => "<&",
            IORedirectionKind::OpenRW => "<>",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirection {
    pub file_descriptor: Option<u32>,
    pub kind: IORedirectionKind,
    pub file: Word,
}

impl Redirection {
    /// The descriptor this redirection changes
    pub fn target_fd(&self) -> u32 {
        self.file_descriptor
            .unwrap_or_else(|| self.kind.default_fd())
    }
}

impl Display for Redirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(fd) = self.file_descriptor {
            write!(f, "{fd}")?;
        }
        write!(f, "{}{}", self.kind.operator(), self.file)
    }
}

#[derive(PartialEq, Eq, Clone)]
pub struct Assignment {
    pub name: Name,
    pub value: Word,
}

impl std::fmt::Debug for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}={:?}", self.name, self.value)
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

#[derive(PartialEq, Eq, Default, Clone)]
pub struct SimpleCommand {
    pub assignments: Vec<Assignment>,
    pub redirections: Vec<Redirection>,
    pub words: Vec<Word>,
}

impl std::fmt::Debug for SimpleCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SimpleCommand:")?;
        writeln!(f, "  assignments: {:?}", self.assignments)?;
        writeln!(f, "  words: {:?}", self.words)?;
        writeln!(f, "  redirections: {:?}", self.redirections)?;
        Ok(())
    }
}

impl Display for SimpleCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let assignments = self.assignments.iter().map(ToString::to_string);
        let words = self.words.iter().map(ToString::to_string);
        let redirections = self.redirections.iter().map(ToString::to_string);
        let parts = assignments
            .chain(words)
            .chain(redirections)
            .collect::<Vec<_>>();
        f.write_str(&parts.join(" "))
    }
}

impl SimpleCommand {
    pub fn none_if_empty(self) -> Option<Self> {
        if self == Self::default() {
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseItem {
    pub pattern: Vec<Word>,
    pub body: CompleteCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    pub condition: CompleteCommand,
    pub body: CompleteCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompoundCommand {
    BraceGroup(CompleteCommand),
    Subshell(CompleteCommand),
    ForClause {
        iter_var: Name,
        words: Vec<Word>,
        body: CompleteCommand,
    },
    CaseClause {
        arg: Word,
        cases: Vec<CaseItem>,
    },
    IfClause {
        if_chain: Vec<If>,
        else_body: Option<CompleteCommand>,
    },
    WhileClause {
        condition: CompleteCommand,
        body: CompleteCommand,
    },
    UntilClause {
        condition: CompleteCommand,
        body: CompleteCommand,
    },
}

impl Display for CompoundCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CompoundCommand::BraceGroup(body) => write!(f, "{{ {body}; }}"),
            CompoundCommand::Subshell(body) => write!(f, "( {body} )"),
            CompoundCommand::ForClause {
                iter_var,
                words,
                body,
            } => {
                write!(f, "for {iter_var} in")?;
                for word in words {
                    write!(f, " {word}")?;
                }
                write!(f, "; do {body}; done")
            }
            CompoundCommand::CaseClause { arg, cases } => {
                write!(f, "case {arg} in")?;
                for case in cases {
                    let patterns = case
                        .pattern
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>();
                    write!(f, " ({})", patterns.join("|"))?;
                    if !case.body.commands.is_empty() {
                        write!(f, " {}", case.body)?;
                    }
                    write!(f, " ;;")?;
                }
                write!(f, " esac")
            }
            CompoundCommand::IfClause {
                if_chain,
                else_body,
            } => {
                for (i, if_) in if_chain.iter().enumerate() {
                    let keyword = if i == 0 { "if" } else { "elif" };
                    write!(f, "{keyword} {}; then {}; ", if_.condition, if_.body)?;
                }
                if let Some(else_body) = else_body {
                    write!(f, "else {else_body}; ")?;
                }
                write!(f, "fi")
            }
            CompoundCommand::WhileClause { condition, body } => {
                write!(f, "while {condition}; do {body}; done")
            }
            CompoundCommand::UntilClause { condition, body } => {
                write!(f, "until {condition}; do {body}; done")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub name: Name,
    pub body: Rc<CompoundCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandType {
    FunctionDefinition(FunctionDefinition),
    SimpleCommand(SimpleCommand),
    CompoundCommand {
        command: CompoundCommand,
        redirections: Vec<Redirection>,
    },
}

#[derive(Debug, Clone)]
pub struct Command {
    pub type_: CommandType,
    pub lineno: u32,
}

impl Command {
    pub fn new(type_: CommandType, lineno: u32) -> Self {
        Self { type_, lineno }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.type_ {
            CommandType::FunctionDefinition(definition) => {
                write!(f, "{}() {}", definition.name, definition.body)
            }
            CommandType::SimpleCommand(command) => write!(f, "{command}"),
            CommandType::CompoundCommand {
                command,
                redirections,
            } => {
                write!(f, "{command}")?;
                for redirection in redirections {
                    write!(f, " {redirection}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub negate_status: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Pipeline{}:",
            if self.negate_status { " (negated)" } else { "" }
        )?;
        for command in &self.commands {
            writeln!(f, "{}", indent(command))?;
        }
        Ok(())
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.negate_status {
            f.write_str("! ")?;
        }
        let commands = self
            .commands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        f.write_str(&commands.join(" | "))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicalOp {
    And,
    Or,
    None,
}

/// An AND-OR list
#[derive(Clone)]
pub struct Conjunction {
    pub elements: Vec<(Pipeline, LogicalOp)>,
}

impl std::fmt::Debug for Conjunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Conjunction:")?;
        for (pipeline, logical_op) in &self.elements {
            writeln!(f, "{}", indent(pipeline))?;
            if *logical_op != LogicalOp::None {
                writeln!(f, "{:?}", logical_op)?;
            }
        }
        Ok(())
    }
}

impl Display for Conjunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (pipeline, op) in &self.elements {
            write!(f, "{pipeline}")?;
            match op {
                LogicalOp::And => f.write_str(" && ")?,
                LogicalOp::Or => f.write_str(" || ")?,
                LogicalOp::None => {}
            }
        }
        Ok(())
    }
}

/// A sequence of AND-OR lists
#[derive(Clone)]
pub struct CompleteCommand {
    pub commands: Vec<Conjunction>,
}

impl std::fmt::Debug for CompleteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CompleteCommand:")?;
        for conjunction in &self.commands {
            writeln!(f, "{}", indent(conjunction))?;
        }
        Ok(())
    }
}

impl Display for CompleteCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let commands = self
            .commands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        f.write_str(&commands.join("; "))
    }
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Program {
    pub commands: Vec<CompleteCommand>,
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for command in &self.commands {
            writeln!(f, "{command}")?;
        }
        Ok(())
    }
}

fn indent<D: std::fmt::Debug>(val: &D) -> String {
    format!("{:?}", val)
        .lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<String>>()
        .join("\n")
}

// line numbers are diagnostic only, two commands are the same if they do the same thing
impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.type_ == other.type_
    }
}

impl Eq for Command {}

impl PartialEq for Pipeline {
    fn eq(&self, other: &Self) -> bool {
        self.commands == other.commands && self.negate_status == other.negate_status
    }
}

impl Eq for Pipeline {}

impl PartialEq for Conjunction {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl Eq for Conjunction {}

impl PartialEq for CompleteCommand {
    fn eq(&self, other: &Self) -> bool {
        self.commands == other.commands
    }
}

impl Eq for CompleteCommand {}

#[cfg(test)]
mod tests {
    use super::*;

    impl From<CommandType> for Command {
        fn from(value: CommandType) -> Self {
            Command::new(value, 0)
        }
    }

    fn parse_program(text: &str) -> Program {
        crate::parse::parse(text).unwrap_or_else(|err| panic!("`{text}`: {err}"))
    }

    /// Printing a program and parsing it again yields the same program,
    /// and printing is stable from then on
    fn assert_reparses(text: &str) {
        let program = parse_program(text);
        let printed = program.to_string();
        let reparsed = parse_program(&printed);
        assert_eq!(reparsed, program, "`{text}` printed as `{printed}`");
        assert_eq!(reparsed.to_string(), printed);
    }

    #[test]
    fn simple_commands_and_lists_reparse() {
        assert_reparses("echo a 'b  c' \"d $e\" f\\ g");
        assert_reparses("A=1 B=\"$A\" cmd arg >out 2>&1 <in 3<>rw 4>>log 5>|x");
        assert_reparses("A=1; B=2\nC=3");
        assert_reparses("a | b | c && ! d || e; f & g");
    }

    #[test]
    fn expansions_reparse() {
        assert_reparses("echo $1 ${10} $# $@ \"$@\" $* $? $$ $0");
        assert_reparses("echo ${A-x} ${A:-x} ${A=x} ${A:=x} ${A+x} ${A:+x} ${#A}");
        assert_reparses("echo ${A?} ${A:?msg} ${A#p*} ${A##p*} ${A%s} ${A%%s}");
        assert_reparses("echo $(echo $(echo world)) `echo x` \"$(echo y)\"");
    }

    #[test]
    fn compound_commands_reparse() {
        assert_reparses("{ a; b; } >out");
        assert_reparses("(a; b) 2>/dev/null");
        assert_reparses("for x in 1 2 \"$@\"; do echo $x; done");
        assert_reparses("for x; do echo $x; done");
        assert_reparses("case $x in a|b) echo ab;; (c*) ;; *) echo other; esac");
        assert_reparses("if a; then b; elif c; then d; else e; fi");
        assert_reparses("while a; do b; done; until c; do d; done");
        assert_reparses("f() { echo $1; }; g() (exit 2)");
        assert_reparses("for i in 1 2; do\n  if [ $i = 2 ]; then\n    break\n  fi\ndone");
    }
}

//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::command::{
    Assignment, CaseItem, Command, CommandType, CompleteCommand, CompoundCommand, Conjunction,
    FunctionDefinition, IORedirectionKind, If, LogicalOp, Name, Pipeline, Program, Redirection,
    SimpleCommand,
};
use crate::parse::tokenizer::{tokenize, Operator, Token, TokenKind};
use crate::parse::word::{Parameter, ParameterExpansion, SpecialParameter, Word, WordPart};
use crate::parse::word_parser::parse_word;
use crate::parse::{ParseResult, ParserError, SyntaxError};
use std::rc::Rc;

const MAX_FD: u32 = 1023;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReservedWord {
    Bang,
    LBrace,
    RBrace,
    Case,
    Do,
    Done,
    Elif,
    Else,
    Esac,
    Fi,
    For,
    If,
    In,
    Then,
    Until,
    While,
}

impl ReservedWord {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "!" => Some(ReservedWord::Bang),
            "{" => Some(ReservedWord::LBrace),
            "}" => Some(ReservedWord::RBrace),
            "case" => Some(ReservedWord::Case),
            "do" => Some(ReservedWord::Do),
            "done" => Some(ReservedWord::Done),
            "elif" => Some(ReservedWord::Elif),
            "else" => Some(ReservedWord::Else),
            "esac" => Some(ReservedWord::Esac),
            "fi" => Some(ReservedWord::Fi),
            "for" => Some(ReservedWord::For),
            "if" => Some(ReservedWord::If),
            "in" => Some(ReservedWord::In),
            "then" => Some(ReservedWord::Then),
            "until" => Some(ReservedWord::Until),
            "while" => Some(ReservedWord::While),
            _ => None,
        }
    }

    /// reserved words that end a compound list
    fn is_list_terminator(self) -> bool {
        matches!(
            self,
            ReservedWord::RBrace
                | ReservedWord::Do
                | ReservedWord::Done
                | ReservedWord::Elif
                | ReservedWord::Else
                | ReservedWord::Esac
                | ReservedWord::Fi
                | ReservedWord::Then
        )
    }
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn try_into_assignment(word: &str, line_no: u32) -> ParseResult<Option<Assignment>> {
    match word.split_once('=') {
        Some((name, value)) if is_valid_name(name) => {
            let value = parse_word(value, line_no)?;
            Ok(Some(Assignment {
                name: Rc::from(name),
                value,
            }))
        }
        _ => Ok(None),
    }
}

struct CommandParser<'src> {
    source: &'src str,
    tokens: Vec<Token<'src>>,
    position: usize,
}

impl<'src> CommandParser<'src> {
    fn peek(&self) -> TokenKind<'src> {
        self.tokens
            .get(self.position)
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    fn peek_lineno(&self) -> u32 {
        self.tokens
            .get(self.position)
            .or(self.tokens.last())
            .map_or(1, |token| token.lineno)
    }

    /// returns the current token and moves to the next one, stopping at `Eof`
    fn next(&mut self) -> TokenKind<'src> {
        let kind = self.peek();
        if kind != TokenKind::Eof {
            self.position += 1;
        }
        kind
    }

    fn peek_word(&self) -> Option<&'src str> {
        match self.peek() {
            TokenKind::Word(word) => Some(word),
            _ => None,
        }
    }

    fn is_operator(&self, op: Operator) -> bool {
        self.peek() == TokenKind::Operator(op)
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        let matches = self.is_operator(op);
        if matches {
            self.next();
        }
        matches
    }

    fn expect_operator(&mut self, op: Operator) -> ParseResult<()> {
        if self.eat_operator(op) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn peek_reserved_word(&self) -> Option<ReservedWord> {
        self.peek_word().and_then(ReservedWord::from_word)
    }

    fn is_reserved_word(&self, word: ReservedWord) -> bool {
        self.peek_reserved_word() == Some(word)
    }

    fn expect_reserved_word(&mut self, word: ReservedWord) -> ParseResult<()> {
        if self.is_reserved_word(word) {
            self.next();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected_token(&self, token: String, lineno: u32) -> ParserError {
        let line = self
            .source
            .lines()
            .nth(lineno.saturating_sub(1) as usize)
            .unwrap_or_default();
        ParserError::new(
            lineno,
            SyntaxError::UnexpectedToken {
                token,
                line: line.to_string(),
            },
        )
    }

    /// Error for an operator that is missing its operand at the end of the
    /// text, which is reported as an unexpected newline
    fn unexpected_end_of_line(&self, lineno: u32) -> ParserError {
        self.unexpected_token("newline".to_string(), lineno)
    }

    /// error for the current token
    fn unexpected(&self) -> ParserError {
        match self.peek() {
            TokenKind::Eof => ParserError::new(self.peek_lineno(), SyntaxError::UnexpectedEof),
            token => self.unexpected_token(token.to_string(), self.peek_lineno()),
        }
    }

    fn parse_word(&mut self) -> ParseResult<Word> {
        let lineno = self.peek_lineno();
        match self.peek_word() {
            Some(word) => {
                self.next();
                parse_word(word, lineno)
            }
            None => Err(self.unexpected()),
        }
    }

    fn parse_name(&mut self) -> ParseResult<Name> {
        match self.peek_word() {
            Some(word) if is_valid_name(word) => {
                self.next();
                Ok(Rc::from(word))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == TokenKind::Newline {
            self.next();
        }
    }

    /// skips `;` or newlines, if present
    fn skip_sequential_separator(&mut self) {
        self.eat_operator(Operator::Semicolon);
        self.skip_newlines();
    }

    fn parse_redirection_opt(&mut self) -> ParseResult<Option<Redirection>> {
        let lineno = self.peek_lineno();
        let file_descriptor = match self.peek() {
            TokenKind::IoNumber(n) if n > MAX_FD => {
                return Err(ParserError::invalid(
                    lineno,
                    format!("{n}: invalid file descriptor"),
                ));
            }
            TokenKind::IoNumber(n) => {
                self.next();
                Some(n)
            }
            _ => None,
        };
        let kind = match self.peek() {
            TokenKind::Operator(Operator::Great) => IORedirectionKind::RedirectOutput,
            TokenKind::Operator(Operator::Clobber) => IORedirectionKind::RedirectOutputClobber,
            TokenKind::Operator(Operator::DoubleGreat) => IORedirectionKind::RedirectOutputAppend,
            TokenKind::Operator(Operator::GreatAnd) => IORedirectionKind::DuplicateOutput,
            TokenKind::Operator(Operator::Less) => IORedirectionKind::RedirectInput,
            TokenKind::Operator(Operator::LessAnd) => IORedirectionKind::DuplicateInput,
            TokenKind::Operator(Operator::LessGreat) => IORedirectionKind::OpenRW,
            _ => return Ok(None),
        };
        self.next();
        if self.peek() == TokenKind::Eof {
            return Err(self.unexpected_end_of_line(lineno));
        }
        let file = self.parse_word()?;
        Ok(Some(Redirection {
            file_descriptor,
            kind,
            file,
        }))
    }

    fn parse_simple_command(&mut self) -> ParseResult<Option<SimpleCommand>> {
        // simple_command = (io_redirect | assignment_word)* word? (io_redirect | word)*
        let mut command = SimpleCommand::default();
        loop {
            let lineno = self.peek_lineno();
            if let Some(word) = self.peek_word() {
                self.next();
                let assignment = if command.words.is_empty() {
                    try_into_assignment(word, lineno)?
                } else {
                    None
                };
                match assignment {
                    Some(assignment) => command.assignments.push(assignment),
                    None => command.words.push(parse_word(word, lineno)?),
                }
            } else if let Some(redirection) = self.parse_redirection_opt()? {
                command.redirections.push(redirection);
            } else {
                break;
            }
        }
        Ok(command.none_if_empty())
    }

    /// A compound list that must contain at least one command
    fn parse_compound_list(&mut self) -> ParseResult<CompleteCommand> {
        let commands = self.parse_compound_list_opt()?;
        if commands.commands.is_empty() {
            return Err(self.unexpected());
        }
        Ok(commands)
    }

    /// compound_list = linebreak and_or ((";" | "&" | "\n") linebreak and_or)* separator?
    fn parse_compound_list_opt(&mut self) -> ParseResult<CompleteCommand> {
        self.skip_newlines();
        let mut commands = Vec::new();
        while let Some(conjunction) = self.parse_and_or()? {
            commands.push(conjunction);
            match self.peek() {
                // commands are always run in the foreground
                TokenKind::Operator(Operator::And | Operator::Semicolon) | TokenKind::Newline => {
                    self.next();
                    self.skip_newlines();
                }
                _ => break,
            }
        }
        Ok(CompleteCommand { commands })
    }

    fn parse_do_group(&mut self) -> ParseResult<CompleteCommand> {
        self.expect_reserved_word(ReservedWord::Do)?;
        let body = self.parse_compound_list()?;
        self.expect_reserved_word(ReservedWord::Done)?;
        Ok(body)
    }

    /// `for name [in word...]` followed by a do group, after `for`
    fn parse_for_clause(&mut self) -> ParseResult<CompoundCommand> {
        let iter_var = self.parse_name()?;
        self.skip_newlines();
        // `for name do` iterates over "$@"
        let mut words = vec![Word {
            parts: vec![WordPart::ParameterExpansion {
                expansion: ParameterExpansion::Simple(Parameter::Special(SpecialParameter::At)),
                inside_double_quotes: true,
            }],
        }];
        if self.is_reserved_word(ReservedWord::In) {
            self.next();
            words.clear();
            while self.peek_word().is_some() {
                words.push(self.parse_word()?);
            }
        }
        self.skip_sequential_separator();
        let body = self.parse_do_group()?;
        Ok(CompoundCommand::ForClause {
            iter_var,
            words,
            body,
        })
    }

    fn parse_case_item(&mut self) -> ParseResult<CaseItem> {
        self.eat_operator(Operator::LParen);
        let mut pattern = vec![self.parse_word()?];
        while self.eat_operator(Operator::Pipe) {
            pattern.push(self.parse_word()?);
        }
        self.expect_operator(Operator::RParen)?;
        let body = self.parse_compound_list_opt()?;
        if self.eat_operator(Operator::DoubleSemicolon) {
            self.skip_newlines();
        } else if !self.is_reserved_word(ReservedWord::Esac) {
            return Err(self.unexpected());
        }
        Ok(CaseItem { body, pattern })
    }

    /// after `case`
    fn parse_case_clause(&mut self) -> ParseResult<CompoundCommand> {
        let arg = self.parse_word()?;
        self.skip_newlines();
        self.expect_reserved_word(ReservedWord::In)?;
        self.skip_newlines();
        let mut cases = Vec::new();
        while !self.is_reserved_word(ReservedWord::Esac) {
            cases.push(self.parse_case_item()?);
        }
        self.next();
        Ok(CompoundCommand::CaseClause { arg, cases })
    }

    /// after `if`
    fn parse_if_clause(&mut self) -> ParseResult<CompoundCommand> {
        let mut if_chain = Vec::new();
        let else_body = loop {
            let condition = self.parse_compound_list()?;
            self.expect_reserved_word(ReservedWord::Then)?;
            let body = self.parse_compound_list()?;
            if_chain.push(If { condition, body });
            match self.peek_reserved_word() {
                Some(ReservedWord::Elif) => {
                    self.next();
                }
                Some(ReservedWord::Else) => {
                    self.next();
                    break Some(self.parse_compound_list()?);
                }
                _ => break None,
            }
        };
        self.expect_reserved_word(ReservedWord::Fi)?;
        Ok(CompoundCommand::IfClause {
            if_chain,
            else_body,
        })
    }

    fn parse_compound_command(&mut self) -> ParseResult<Option<CompoundCommand>> {
        if self.eat_operator(Operator::LParen) {
            let inner = self.parse_compound_list()?;
            self.expect_operator(Operator::RParen)?;
            return Ok(Some(CompoundCommand::Subshell(inner)));
        }
        let Some(reserved_word) = self.peek_reserved_word() else {
            return Ok(None);
        };
        let starts_compound_command = matches!(
            reserved_word,
            ReservedWord::LBrace
                | ReservedWord::For
                | ReservedWord::Case
                | ReservedWord::If
                | ReservedWord::While
                | ReservedWord::Until
        );
        if !starts_compound_command {
            return Ok(None);
        }
        self.next();
        let command = match reserved_word {
            ReservedWord::LBrace => {
                let inner = self.parse_compound_list()?;
                self.expect_reserved_word(ReservedWord::RBrace)?;
                CompoundCommand::BraceGroup(inner)
            }
            ReservedWord::For => self.parse_for_clause()?,
            ReservedWord::Case => self.parse_case_clause()?,
            ReservedWord::If => self.parse_if_clause()?,
            ReservedWord::While => CompoundCommand::WhileClause {
                condition: self.parse_compound_list()?,
                body: self.parse_do_group()?,
            },
            _ => CompoundCommand::UntilClause {
                condition: self.parse_compound_list()?,
                body: self.parse_do_group()?,
            },
        };
        Ok(Some(command))
    }

    /// after `name (`
    fn parse_function_definition(
        &mut self,
        name: Name,
        lineno: u32,
    ) -> ParseResult<FunctionDefinition> {
        if self.peek() == TokenKind::Eof {
            return Err(self.unexpected_end_of_line(lineno));
        }
        self.expect_operator(Operator::RParen)?;
        self.skip_newlines();
        match self.parse_compound_command()? {
            Some(body) => Ok(FunctionDefinition {
                name,
                body: Rc::new(body),
            }),
            None => Err(self.unexpected()),
        }
    }

    fn parse_command(&mut self) -> ParseResult<Option<Command>> {
        // command =
        // 			| compound_command redirect_list?
        // 			| simple_command
        // 			| function_definition
        let lineno = self.peek_lineno();
        if self
            .peek_reserved_word()
            .is_some_and(ReservedWord::is_list_terminator)
        {
            return Ok(None);
        }
        if let Some(command) = self.parse_compound_command()? {
            let mut redirections = Vec::new();
            while let Some(redirection) = self.parse_redirection_opt()? {
                redirections.push(redirection);
            }
            return Ok(Some(Command::new(
                CommandType::CompoundCommand {
                    command,
                    redirections,
                },
                lineno,
            )));
        }
        let next_is_lparen = self
            .tokens
            .get(self.position + 1)
            .is_some_and(|token| token.kind == TokenKind::Operator(Operator::LParen));
        match self.peek_word() {
            Some(name) if next_is_lparen && is_valid_name(name) => {
                self.next();
                self.next();
                let definition = self.parse_function_definition(Rc::from(name), lineno)?;
                Ok(Some(Command::new(
                    CommandType::FunctionDefinition(definition),
                    lineno,
                )))
            }
            _ => Ok(self
                .parse_simple_command()?
                .map(|command| Command::new(CommandType::SimpleCommand(command), lineno))),
        }
    }

    fn parse_pipeline(&mut self) -> ParseResult<Option<Pipeline>> {
        // pipeline = "!"? command ("|" linebreak command)*
        let negate_status = self.is_reserved_word(ReservedWord::Bang);
        if negate_status {
            self.next();
        }
        let mut commands = match self.parse_command()? {
            Some(command) => vec![command],
            None if negate_status => return Err(self.unexpected()),
            None => return Ok(None),
        };
        while self.eat_operator(Operator::Pipe) {
            self.skip_newlines();
            match self.parse_command()? {
                Some(command) => commands.push(command),
                None => return Err(self.unexpected()),
            }
        }
        Ok(Some(Pipeline {
            commands,
            negate_status,
        }))
    }

    fn parse_and_or(&mut self) -> ParseResult<Option<Conjunction>> {
        // and_or = pipeline (("&&" | "||") linebreak pipeline)*
        let Some(mut last) = self.parse_pipeline()? else {
            return Ok(None);
        };
        let mut elements = Vec::new();
        loop {
            let op = match self.peek() {
                TokenKind::Operator(Operator::AndIf) => LogicalOp::And,
                TokenKind::Operator(Operator::OrIf) => LogicalOp::Or,
                _ => break,
            };
            self.next();
            self.skip_newlines();
            let Some(next) = self.parse_pipeline()? else {
                return Err(self.unexpected());
            };
            elements.push((std::mem::replace(&mut last, next), op));
        }
        elements.push((last, LogicalOp::None));
        Ok(Some(Conjunction { elements }))
    }

    fn parse_complete_command(&mut self) -> ParseResult<CompleteCommand> {
        // complete_command = and_or (separator_op and_or)* separator_op?
        let mut commands = Vec::new();
        loop {
            match self.parse_and_or()? {
                Some(and_or) => commands.push(and_or),
                None => return Err(self.unexpected()),
            }
            match self.peek() {
                TokenKind::Operator(Operator::And | Operator::Semicolon) => {
                    self.next();
                    if matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
                        break;
                    }
                }
                TokenKind::Newline | TokenKind::Eof => break,
                _ => return Err(self.unexpected()),
            }
        }
        Ok(CompleteCommand { commands })
    }

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut program = Program::default();
        self.skip_newlines();
        while self.peek() != TokenKind::Eof {
            program.commands.push(self.parse_complete_command()?);
            self.skip_newlines();
        }
        Ok(program)
    }
}

/// Parses the whole text. Nothing is returned unless all of it is valid.
pub fn parse(text: &str) -> ParseResult<Program> {
    CommandParser {
        source: text,
        tokens: tokenize(text)?,
        position: 0,
    }
    .parse_program()
}

#[cfg(test)]
mod tests {
    use crate::parse::word::test_utils::{quoted_literal, unquoted_literal};

    use super::*;

    fn parse_correct_complete_command(text: &str) -> CompleteCommand {
        let program = parse(text).expect("parsing failed");
        assert_eq!(program.commands.len(), 1);
        program.commands.into_iter().next().unwrap()
    }

    fn simple_command_from_word(word: Word) -> Command {
        CommandType::SimpleCommand(SimpleCommand {
            words: vec![word],
            ..Default::default()
        })
        .into()
    }

    fn pipeline_from_word(word: Word) -> Pipeline {
        Pipeline {
            commands: vec![simple_command_from_word(word)],
            negate_status: false,
        }
    }

    fn conjunction_from_word(word: Word) -> Conjunction {
        Conjunction {
            elements: vec![(pipeline_from_word(word), LogicalOp::None)],
        }
    }

    fn complete_command_from_word(word: Word) -> CompleteCommand {
        CompleteCommand {
            commands: vec![conjunction_from_word(word)],
        }
    }

    fn complete_command_from_words(words: &[&str]) -> CompleteCommand {
        CompleteCommand {
            commands: words
                .iter()
                .map(|word| conjunction_from_word(unquoted_literal(word)))
                .collect(),
        }
    }

    fn unwrap_conjunction(cmd: CompleteCommand) -> Conjunction {
        assert_eq!(cmd.commands.len(), 1);
        cmd.commands.into_iter().next().unwrap()
    }

    fn unwrap_pipeline(cmd: CompleteCommand) -> Pipeline {
        let conjunction = unwrap_conjunction(cmd);
        assert_eq!(conjunction.elements.len(), 1);
        let (pipeline, _) = conjunction.elements.into_iter().next().unwrap();
        pipeline
    }

    fn unwrap_command(cmd: CompleteCommand) -> Command {
        let pipeline = unwrap_pipeline(cmd);
        assert_eq!(pipeline.commands.len(), 1);
        pipeline.commands.into_iter().next().unwrap()
    }

    fn parse_simple_command(text: &str) -> SimpleCommand {
        let command = unwrap_command(parse_correct_complete_command(text));
        if let CommandType::SimpleCommand(command) = command.type_ {
            command
        } else {
            panic!("expected simple command")
        }
    }

    fn parse_single_redirection(text: &str) -> Redirection {
        let cmd = parse_simple_command(text);
        assert!(cmd.words.is_empty());
        assert!(cmd.assignments.is_empty());
        assert_eq!(cmd.redirections.len(), 1);
        cmd.redirections.into_iter().next().unwrap()
    }

    fn parse_compound_command(text: &str) -> (CompoundCommand, Vec<Redirection>) {
        let command = unwrap_command(parse_correct_complete_command(text));
        if let CommandType::CompoundCommand {
            command,
            redirections,
        } = command.type_
        {
            (command, redirections)
        } else {
            panic!("expected compound command, got {:?}", command)
        }
    }

    fn parse_command(text: &str) -> Command {
        unwrap_command(parse_correct_complete_command(text))
    }

    fn parse_pipeline(text: &str) -> Pipeline {
        unwrap_pipeline(parse_correct_complete_command(text))
    }

    fn parse_conjunction(text: &str) -> Conjunction {
        unwrap_conjunction(parse_correct_complete_command(text))
    }

    fn redirection(fd: Option<u32>, kind: IORedirectionKind, file: &str) -> Redirection {
        Redirection {
            file_descriptor: fd,
            kind,
            file: unquoted_literal(file),
        }
    }

    #[test]
    fn parse_empty_program() {
        assert_eq!(parse("").unwrap(), Program::default());
        assert_eq!(parse("\n\n  # comment\n").unwrap(), Program::default());
    }

    #[test]
    fn parse_simple_command_no_assignments_no_redirections_no_arguments() {
        let command = parse_simple_command("pwd");
        assert_eq!(command.words, vec![unquoted_literal("pwd")]);
        assert!(command.assignments.is_empty());
        assert!(command.redirections.is_empty());
    }

    #[test]
    fn parse_simple_command_single_assignment() {
        let command = parse_simple_command("a=1");
        assert_eq!(command.assignments.len(), 1);
        assert_eq!(command.assignments[0].name, Rc::from("a"));
        assert_eq!(command.assignments[0].value, unquoted_literal("1"));
        assert!(command.redirections.is_empty());
        assert!(command.words.is_empty());
    }

    #[test]
    fn parse_simple_command_multiple_assignment() {
        let command =
            parse_simple_command("PATH=/bin:/usr/bin:/usr/local/bin a=1 b=\"this is a test\"");
        assert_eq!(command.assignments.len(), 3);
        assert_eq!(command.assignments[0].name, Rc::from("PATH"));
        assert_eq!(
            command.assignments[0].value,
            unquoted_literal("/bin:/usr/bin:/usr/local/bin")
        );
        assert_eq!(command.assignments[1].name, Rc::from("a"));
        assert_eq!(command.assignments[1].value, unquoted_literal("1"));
        assert_eq!(command.assignments[2].name, Rc::from("b"));
        assert_eq!(
            command.assignments[2].value,
            quoted_literal("this is a test")
        );
        assert!(command.redirections.is_empty());
        assert!(command.words.is_empty());
    }

    #[test]
    fn assignment_after_command_name_is_an_argument() {
        let command = parse_simple_command("A=1 cmd B=2");
        assert_eq!(command.assignments.len(), 1);
        assert_eq!(
            command.words,
            vec![unquoted_literal("cmd"), unquoted_literal("B=2")]
        );
    }

    #[test]
    fn quoted_name_is_not_an_assignment() {
        let command = parse_simple_command("'A'=1");
        assert!(command.assignments.is_empty());
        assert_eq!(command.words.len(), 1);
    }

    #[test]
    fn parse_redirections_without_file_descriptors() {
        assert_eq!(
            parse_single_redirection("> test_file"),
            redirection(None, IORedirectionKind::RedirectOutput, "test_file")
        );
        assert_eq!(
            parse_single_redirection(">| test_file"),
            redirection(None, IORedirectionKind::RedirectOutputClobber, "test_file")
        );
        assert_eq!(
            parse_single_redirection(">> test_file"),
            redirection(None, IORedirectionKind::RedirectOutputAppend, "test_file")
        );
        assert_eq!(
            parse_single_redirection(">& test_file"),
            redirection(None, IORedirectionKind::DuplicateOutput, "test_file")
        );
        assert_eq!(
            parse_single_redirection("< test_file"),
            redirection(None, IORedirectionKind::RedirectInput, "test_file")
        );
        assert_eq!(
            parse_single_redirection("<& test_file"),
            redirection(None, IORedirectionKind::DuplicateInput, "test_file")
        );
        assert_eq!(
            parse_single_redirection("<> test_file"),
            redirection(None, IORedirectionKind::OpenRW, "test_file")
        );
    }

    #[test]
    fn parse_redirection_with_optional_file_descriptor() {
        assert_eq!(
            parse_single_redirection("2> test_file"),
            redirection(Some(2), IORedirectionKind::RedirectOutput, "test_file")
        );
        assert_eq!(
            parse_single_redirection("2>&1"),
            redirection(Some(2), IORedirectionKind::DuplicateOutput, "1")
        );
    }

    #[test]
    fn parse_command_with_redirections() {
        let command = parse_simple_command("< input command > output");
        assert_eq!(command.words, vec![unquoted_literal("command")]);
        assert_eq!(
            command.redirections,
            vec![
                redirection(None, IORedirectionKind::RedirectInput, "input"),
                redirection(None, IORedirectionKind::RedirectOutput, "output")
            ]
        );
        assert!(command.assignments.is_empty());
    }

    #[test]
    fn parse_simple_command_with_arguments_redirections_and_assignments() {
        let command = parse_simple_command("A=1 echo hello> /dev/null world 2>&1");
        assert_eq!(command.assignments.len(), 1);
        assert_eq!(
            command.words,
            vec![
                unquoted_literal("echo"),
                unquoted_literal("hello"),
                unquoted_literal("world")
            ]
        );
        assert_eq!(
            command.redirections,
            vec![
                redirection(None, IORedirectionKind::RedirectOutput, "/dev/null"),
                redirection(Some(2), IORedirectionKind::DuplicateOutput, "1")
            ]
        );
    }

    #[test]
    fn parse_simple_pipeline() {
        let pipeline = parse_pipeline("echo hello | wc -l");
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(
            pipeline.commands[0],
            CommandType::SimpleCommand(SimpleCommand {
                words: vec![unquoted_literal("echo"), unquoted_literal("hello")],
                ..Default::default()
            })
            .into()
        );
        assert_eq!(
            pipeline.commands[1],
            CommandType::SimpleCommand(SimpleCommand {
                words: vec![unquoted_literal("wc"), unquoted_literal("-l")],
                ..Default::default()
            })
            .into()
        );
    }

    #[test]
    fn pipe_can_be_followed_by_newlines() {
        assert_eq!(parse_pipeline("a |\n\nb"), parse_pipeline("a | b"));
    }

    #[test]
    fn parse_simple_conjunction() {
        let conjunction = parse_conjunction("a && b || c");
        assert_eq!(
            conjunction.elements,
            vec![
                (pipeline_from_word(unquoted_literal("a")), LogicalOp::And),
                (pipeline_from_word(unquoted_literal("b")), LogicalOp::Or),
                (pipeline_from_word(unquoted_literal("c")), LogicalOp::None),
            ]
        );
    }

    #[test]
    fn parse_commands_separated_by_semicolon() {
        assert_eq!(
            parse_correct_complete_command("a; b;c ;d"),
            complete_command_from_words(&["a", "b", "c", "d"])
        );
        assert_eq!(
            parse_correct_complete_command("a & b &"),
            complete_command_from_words(&["a", "b"])
        );
    }

    #[test]
    fn lines_are_separate_complete_commands() {
        let program = parse("a\nb; c\n\nd").unwrap();
        assert_eq!(
            program.commands,
            vec![
                complete_command_from_words(&["a"]),
                complete_command_from_words(&["b", "c"]),
                complete_command_from_words(&["d"]),
            ]
        );
    }

    #[test]
    fn commands_record_their_line_number() {
        let program = parse("a\n\nb").unwrap();
        let lineno = |cmd: &CompleteCommand| cmd.commands[0].elements[0].0.commands[0].lineno;
        assert_eq!(lineno(&program.commands[0]), 1);
        assert_eq!(lineno(&program.commands[1]), 3);
    }

    #[test]
    fn parse_brace_group() {
        assert_eq!(
            parse_compound_command("{ word; }").0,
            CompoundCommand::BraceGroup(complete_command_from_word(unquoted_literal("word")))
        );
        assert_eq!(
            parse_compound_command("{\ncmd1; cmd2;\ncmd3\n\n\ncmd4 &\n}").0,
            CompoundCommand::BraceGroup(complete_command_from_words(&[
                "cmd1", "cmd2", "cmd3", "cmd4"
            ]))
        )
    }

    #[test]
    fn closing_brace_must_be_in_command_position() {
        assert!(parse("{ echo a }").is_err());
        assert!(parse("{ echo a }; }").is_ok());
    }

    #[test]
    fn parse_subshell() {
        assert_eq!(
            parse_compound_command("(word)").0,
            CompoundCommand::Subshell(complete_command_from_word(unquoted_literal("word")))
        );
        assert_eq!(
            parse_compound_command("(\ncmd1; cmd2 & cmd3;\n\n\ncmd4 &\n)").0,
            CompoundCommand::Subshell(complete_command_from_words(&[
                "cmd1", "cmd2", "cmd3", "cmd4"
            ]))
        )
    }

    #[test]
    fn parse_for_clause() {
        assert_eq!(
            parse_compound_command("for i in 1 2 3; do\ncmd\ndone").0,
            CompoundCommand::ForClause {
                iter_var: Rc::from("i"),
                words: vec![
                    unquoted_literal("1"),
                    unquoted_literal("2"),
                    unquoted_literal("3")
                ],
                body: complete_command_from_word(unquoted_literal("cmd"))
            }
        );
        assert_eq!(
            parse_compound_command("for i in 1 2 3; do\ncmd\ndone"),
            parse_compound_command("for i in 1 2 3\ndo cmd; done")
        );
    }

    #[test]
    fn for_clause_without_in_iterates_over_positional_parameters() {
        let (command, _) = parse_compound_command("for i; do cmd; done");
        if let CompoundCommand::ForClause { words, .. } = command {
            assert!(matches!(
                words[0].parts[0],
                WordPart::ParameterExpansion {
                    expansion: ParameterExpansion::Simple(_),
                    inside_double_quotes: true
                }
            ));
        } else {
            panic!("expected for clause")
        }
    }

    #[test]
    fn parse_empty_case_clause() {
        assert_eq!(
            parse_compound_command("case word in esac").0,
            CompoundCommand::CaseClause {
                arg: unquoted_literal("word"),
                cases: Vec::new()
            }
        );
        assert_eq!(
            parse_compound_command("case word \n\nin\n esac").0,
            CompoundCommand::CaseClause {
                arg: unquoted_literal("word"),
                cases: Vec::new()
            }
        )
    }

    #[test]
    fn parse_case_clause_one_case() {
        assert_eq!(
            parse_compound_command("case word in (pattern) cmd;; esac").0,
            CompoundCommand::CaseClause {
                arg: unquoted_literal("word"),
                cases: vec![CaseItem {
                    pattern: vec![unquoted_literal("pattern")],
                    body: complete_command_from_word(unquoted_literal("cmd"))
                }]
            }
        );
        assert_eq!(
            parse_compound_command("case word in (pattern) cmd;; esac"),
            parse_compound_command("case word in pattern) cmd;; esac")
        );
        assert_eq!(
            parse_compound_command("case word in (pattern) cmd;; esac"),
            parse_compound_command("case word\n in \n(pattern)\n\ncmd\nesac")
        );
    }

    #[test]
    fn parse_case_clause_multiple_cases() {
        assert_eq!(
            parse_compound_command("case word in (p1|p2) cmd1;; (p3) ;; *) cmd3;; esac").0,
            CompoundCommand::CaseClause {
                arg: unquoted_literal("word"),
                cases: vec![
                    CaseItem {
                        pattern: vec![unquoted_literal("p1"), unquoted_literal("p2")],
                        body: complete_command_from_word(unquoted_literal("cmd1"))
                    },
                    CaseItem {
                        pattern: vec![unquoted_literal("p3")],
                        body: CompleteCommand {
                            commands: Vec::new()
                        }
                    },
                    CaseItem {
                        pattern: vec![unquoted_literal("*")],
                        body: complete_command_from_word(unquoted_literal("cmd3"))
                    }
                ]
            }
        );
    }

    #[test]
    fn parse_if_clause_no_else() {
        assert_eq!(
            parse_compound_command("if condition; then cmd; fi").0,
            CompoundCommand::IfClause {
                if_chain: vec![If {
                    condition: complete_command_from_word(unquoted_literal("condition")),
                    body: complete_command_from_word(unquoted_literal("cmd"))
                }],
                else_body: None
            }
        );
    }

    #[test]
    fn parse_if_clause_with_elif_chain() {
        assert_eq!(
            parse_compound_command(
                "if c1; then cmd1; elif c2; then cmd2\nelif c3\nthen cmd3; else cmd4; fi"
            )
            .0,
            CompoundCommand::IfClause {
                if_chain: vec![
                    If {
                        condition: complete_command_from_word(unquoted_literal("c1")),
                        body: complete_command_from_word(unquoted_literal("cmd1"))
                    },
                    If {
                        condition: complete_command_from_word(unquoted_literal("c2")),
                        body: complete_command_from_word(unquoted_literal("cmd2"))
                    },
                    If {
                        condition: complete_command_from_word(unquoted_literal("c3")),
                        body: complete_command_from_word(unquoted_literal("cmd3"))
                    },
                ],
                else_body: Some(complete_command_from_word(unquoted_literal("cmd4")))
            }
        );
    }

    #[test]
    fn parse_while_clause() {
        assert_eq!(
            parse_compound_command("while condition; do cmd; done").0,
            CompoundCommand::WhileClause {
                condition: complete_command_from_word(unquoted_literal("condition")),
                body: complete_command_from_word(unquoted_literal("cmd"))
            }
        );
    }

    #[test]
    fn parse_until_clause() {
        assert_eq!(
            parse_compound_command("until condition; do cmd; done").0,
            CompoundCommand::UntilClause {
                condition: complete_command_from_word(unquoted_literal("condition")),
                body: complete_command_from_word(unquoted_literal("cmd"))
            }
        );
    }

    #[test]
    fn parse_compound_command_with_redirections() {
        let (command, redirections) = parse_compound_command("if a; then b; fi > file.txt");
        assert_eq!(
            command,
            CompoundCommand::IfClause {
                if_chain: vec![If {
                    condition: complete_command_from_word(unquoted_literal("a")),
                    body: complete_command_from_word(unquoted_literal("b"))
                }],
                else_body: None
            }
        );
        assert_eq!(
            redirections,
            vec![redirection(
                None,
                IORedirectionKind::RedirectOutput,
                "file.txt"
            )]
        );
    }

    #[test]
    fn parse_function_definition() {
        assert_eq!(
            parse_command("function_name() { cmd; }"),
            CommandType::FunctionDefinition(FunctionDefinition {
                name: Rc::from("function_name"),
                body: Rc::new(CompoundCommand::BraceGroup(complete_command_from_word(
                    unquoted_literal("cmd")
                )))
            })
            .into()
        );

        assert_eq!(
            parse_command("function_name ()\n( cmd1 )"),
            CommandType::FunctionDefinition(FunctionDefinition {
                name: Rc::from("function_name"),
                body: Rc::new(CompoundCommand::Subshell(complete_command_from_word(
                    unquoted_literal("cmd1")
                )))
            })
            .into()
        );
    }

    #[test]
    fn function_body_must_be_a_compound_command() {
        assert!(parse("f() echo").is_err());
    }

    #[test]
    fn parse_pipeline_negate_status() {
        assert_eq!(
            parse_pipeline("! cmd"),
            Pipeline {
                commands: vec![simple_command_from_word(unquoted_literal("cmd"))],
                negate_status: true
            }
        );
    }

    #[test]
    fn parse_reserved_word_as_simple_word_when_used_as_command_argument() {
        assert_eq!(
            parse_simple_command("echo if then done { } !"),
            SimpleCommand {
                words: ["echo", "if", "then", "done", "{", "}", "!"]
                    .iter()
                    .map(|w| unquoted_literal(w))
                    .collect(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn quoted_reserved_word_is_a_command_name() {
        assert_eq!(
            parse_simple_command("'if'"),
            SimpleCommand {
                words: vec![quoted_literal("if")],
                ..Default::default()
            }
        );
    }

    #[test]
    fn case_arg_can_be_a_reserved_word() {
        assert_eq!(
            parse_compound_command("case case in esac").0,
            CompoundCommand::CaseClause {
                arg: unquoted_literal("case"),
                cases: Vec::new()
            }
        );
    }

    #[test]
    fn word_after_in_can_be_a_reserved_word() {
        assert_eq!(
            parse_compound_command("for word in in do; do cmd; done").0,
            CompoundCommand::ForClause {
                iter_var: Rc::from("word"),
                words: vec![unquoted_literal("in"), unquoted_literal("do")],
                body: complete_command_from_word(unquoted_literal("cmd"))
            }
        );
    }

    #[test]
    fn unclosed_quotes_are_error() {
        assert!(parse("\"unclosed string").is_err());
        assert!(parse("'unclosed string").is_err());
        assert!(parse("echo $(echo").is_err());
    }

    #[test]
    fn out_of_range_file_descriptor_is_error() {
        assert!(parse("2000> file.txt").is_err());
    }

    #[test]
    fn incomplete_commands_are_errors() {
        assert!(parse("command |").is_err());
        assert!(parse("command &&").is_err());
        assert!(parse("command ||").is_err());
        assert!(parse("if true; then echo").is_err());
        assert!(parse("for x in a; do echo").is_err());
        assert!(parse("echo >").is_err());
        assert!(parse("!").is_err());
    }

    #[test]
    fn misplaced_tokens_are_errors() {
        assert!(parse(";").is_err());
        assert!(parse("echo a;;").is_err());
        assert!(parse(")").is_err());
        assert!(parse("done").is_err());
        assert!(parse("echo a; fi").is_err());
        assert!(parse("if; then echo; fi").is_err());
        assert!(parse("{ }").is_err());
        assert!(parse("(a) b").is_err());
        assert!(parse("{ (a) b; }").is_err());
    }

    #[test]
    fn unexpected_tokens_are_reported_with_their_line() {
        let err = parse("echo a\nfi x").unwrap_err();
        assert_eq!(
            err.report("sh: "),
            "sh: line 2: syntax error near unexpected token `fi'\nsh: line 2: `fi x'\n"
        );
        assert_eq!(
            parse("case x in ;; esac").unwrap_err().kind,
            SyntaxError::UnexpectedToken {
                token: ";;".to_string(),
                line: "case x in ;; esac".to_string()
            }
        );
        assert_eq!(
            parse("echo ; ;").unwrap_err().to_string(),
            "line 1: syntax error near unexpected token `;'"
        );
        assert_eq!(
            parse("a() b").unwrap_err().to_string(),
            "line 1: syntax error near unexpected token `b'"
        );
    }

    #[test]
    fn missing_operand_at_the_end_is_an_unexpected_newline() {
        for text in ["echo a >", "echo (", "cat 2<"] {
            let err = parse(text).unwrap_err();
            assert_eq!(
                err.kind,
                SyntaxError::UnexpectedToken {
                    token: "newline".to_string(),
                    line: text.to_string()
                },
                "{text}"
            );
            assert_eq!(err.lineno, 1);
        }
    }

    #[test]
    fn incomplete_programs_end_after_the_last_line() {
        for (text, lineno) in [
            ("echo a; if true; then echo b", 2),
            ("if true; then\necho b", 3),
            ("if x\n", 2),
            ("echo a |", 2),
            ("{ echo a }", 2),
            ("f() ", 2),
        ] {
            let err = parse(text).unwrap_err();
            assert_eq!(err.kind, SyntaxError::UnexpectedEof, "{text}");
            assert_eq!(err.lineno, lineno, "{text}");
        }
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = parse("echo a\necho b\necho )").unwrap_err();
        assert_eq!(err.lineno, 3);
    }

    #[test]
    fn display_output_parses_to_the_same_program() {
        for text in [
            "echo hello\\ world 'single' \"dou\\\"ble\" a\\;b",
            "A=1 B=\"x y\" cmd arg > out 2>&1 < in >> app",
            "! a | b && c || d; e",
            "{ a; b; } > f",
            "(a; (b))",
            "for x in 1 \"$y\" $(echo 3); do echo $x; done",
            "case $a in (a|b) echo ab ;; *) ;; esac",
            "if a; then b; elif c; then d; else e; fi",
            "while a; do b; done; until c; do d; done",
            "f() { echo ${a:-b} ${#c} ${d%e} \"${@}\"; }",
            "echo `echo a` $(echo b)",
        ] {
            let program = parse(text).unwrap();
            let printed = program.to_string();
            assert_eq!(parse(&printed).unwrap(), program, "{printed}");
        }
    }
}

//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use thiserror::Error;

pub mod command;
pub(crate) mod command_parser;
mod tokenizer;
pub mod word;
mod word_parser;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("syntax error: unexpected end of file")]
    UnexpectedEof,
    /// `line` is the source line containing the token
    #[error("syntax error near unexpected token `{token}'")]
    UnexpectedToken { token: String, line: String },
    #[error("unexpected EOF while looking for matching `{0}'")]
    Unterminated(char),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {lineno}: {kind}")]
pub struct ParserError {
    pub lineno: u32,
    pub kind: SyntaxError,
}

impl ParserError {
    fn new(lineno: u32, kind: SyntaxError) -> Self {
        Self { lineno, kind }
    }

    fn invalid<S: Into<String>>(lineno: u32, message: S) -> Self {
        Self::new(lineno, SyntaxError::Invalid(message.into()))
    }

    /// Formats the error as it is written to standard error, every line
    /// starting with `prefix`. An unexpected token is followed by the line
    /// that contains it.
    pub fn report(&self, prefix: &str) -> String {
        let mut report = format!("{prefix}{self}\n");
        if let SyntaxError::UnexpectedToken { line, .. } = &self.kind {
            report.push_str(&format!("{prefix}line {}: `{line}'\n", self.lineno));
        }
        report
    }
}

pub type ParseResult<T> = Result<T, ParserError>;

pub use command_parser::parse;

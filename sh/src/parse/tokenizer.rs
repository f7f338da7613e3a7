//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::{ParseResult, ParserError, SyntaxError};
use std::fmt::{Display, Formatter};

pub fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Characters that end an unquoted word
pub fn is_operator_start(c: char) -> bool {
    matches!(c, '&' | '(' | ')' | ';' | '\n' | '|' | '<' | '>')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    AndIf,
    Pipe,
    OrIf,
    Semicolon,
    DoubleSemicolon,
    LParen,
    RParen,
    Less,
    LessAnd,
    LessGreat,
    Great,
    GreatAnd,
    DoubleGreat,
    Clobber,
}

// two character operators come first, so that the longest operator wins
const OPERATORS: &[(&str, Operator)] = &[
    ("&&", Operator::AndIf),
    ("||", Operator::OrIf),
    (";;", Operator::DoubleSemicolon),
    ("<&", Operator::LessAnd),
    ("<>", Operator::LessGreat),
    (">&", Operator::GreatAnd),
    (">>", Operator::DoubleGreat),
    (">|", Operator::Clobber),
    ("&", Operator::And),
    ("|", Operator::Pipe),
    (";", Operator::Semicolon),
    ("(", Operator::LParen),
    (")", Operator::RParen),
    ("<", Operator::Less),
    (">", Operator::Great),
];

impl Operator {
    pub fn as_str(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(text, _)| *text)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'src> {
    /// Raw text of the word, quotes and escapes included. Reserved words
    /// are words too, the parser recognizes them from their position.
    Word(&'src str),
    Operator(Operator),
    /// Digits directly followed by `<` or `>`
    IoNumber(u32),
    Newline,
    Eof,
}

impl Display for TokenKind<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Word(word) => f.write_str(word),
            TokenKind::Operator(op) => f.write_str(op.as_str()),
            TokenKind::IoNumber(n) => write!(f, "{n}"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind<'src>,
    pub lineno: u32,
}

/// Position in a source text
pub struct Cursor<'src> {
    text: &'src str,
    pos: usize,
    lineno: u32,
}

impl<'src> Cursor<'src> {
    pub fn new(text: &'src str, lineno: u32) -> Self {
        Self {
            text,
            pos: 0,
            lineno,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn lineno(&self) -> u32 {
        self.lineno
    }

    pub fn rest(&self) -> &'src str {
        &self.text[self.pos..]
    }

    pub fn slice(&self, start: usize, end: usize) -> &'src str {
        &self.text[start..end]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.lineno += 1;
        }
        Some(c)
    }

    pub fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Line reported for errors found at the end of the text
    pub fn eof_lineno(&self) -> u32 {
        self.text.lines().count() as u32 + 1
    }

    fn skip_blanks(&mut self) {
        loop {
            match self.peek() {
                Some(c) if is_blank(c) => {
                    self.bump();
                }
                Some('\\') if self.peek_second() == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
    }

    /// stops before the newline
    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn eat_operator(&mut self) -> Option<Operator> {
        let (text, op) = OPERATORS
            .iter()
            .find(|(text, _)| self.rest().starts_with(text))?;
        self.pos += text.len();
        Some(*op)
    }
}

/// Text regions that extend until a closing character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// an unquoted word, ends before a blank or an operator
    Word,
    DoubleQuotes,
    /// `${...}`
    Braces,
    /// `$(...)`
    Parens,
    Backquotes,
}

impl Region {
    fn closer(self) -> Option<char> {
        match self {
            Region::Word => None,
            Region::DoubleQuotes => Some('"'),
            Region::Braces => Some('}'),
            Region::Parens => Some(')'),
            Region::Backquotes => Some('`'),
        }
    }
}

fn unterminated(closer: char, lineno: u32) -> ParserError {
    ParserError::new(lineno, SyntaxError::Unterminated(closer))
}

/// Moves past a single quoted string. The cursor is after the opening quote.
pub fn skip_single_quoted(cursor: &mut Cursor) -> ParseResult<()> {
    let lineno = cursor.lineno();
    loop {
        match cursor.bump() {
            Some('\'') => return Ok(()),
            Some(_) => {}
            None => return Err(unterminated('\'', lineno)),
        }
    }
}

/// Moves past `region`, closing character included. The cursor is after the
/// opening character. Nested quotes and substitutions are skipped as a whole,
/// their contents are interpreted later by the word parser.
pub fn skip_region(cursor: &mut Cursor, region: Region) -> ParseResult<()> {
    let lineno = cursor.lineno();
    let mut open_parens = 0u32;
    let mut at_word_start = true;
    while let Some(c) = cursor.peek() {
        if region == Region::Parens && at_word_start && c == '#' {
            cursor.skip_comment();
            continue;
        }
        at_word_start = false;
        if region == Region::Word && (is_blank(c) || is_operator_start(c)) {
            return Ok(());
        }
        if Some(c) == region.closer() && open_parens == 0 {
            cursor.bump();
            return Ok(());
        }
        cursor.bump();
        match (region, c) {
            (_, '\\') => {
                cursor.bump();
            }
            (Region::Backquotes, _) | (Region::DoubleQuotes, '\'') => {}
            (_, '\'') => skip_single_quoted(cursor)?,
            (_, '"') => skip_region(cursor, Region::DoubleQuotes)?,
            (_, '`') => skip_region(cursor, Region::Backquotes)?,
            (_, '$') => {
                if cursor.eat('(') {
                    skip_region(cursor, Region::Parens)?;
                } else if cursor.eat('{') {
                    skip_region(cursor, Region::Braces)?;
                }
            }
            (Region::Parens, c) => {
                if c == '(' {
                    open_parens += 1;
                } else if c == ')' {
                    open_parens -= 1;
                }
                // a '#' at the start of a word starts a comment
                at_word_start = is_blank(c) || is_operator_start(c);
            }
            _ => {}
        }
    }
    match region.closer() {
        None => Ok(()),
        Some(')') => Err(unterminated(')', cursor.eof_lineno())),
        Some(closer) => Err(unterminated(closer, lineno)),
    }
}

fn word_or_io_number<'src>(cursor: &mut Cursor<'src>) -> ParseResult<TokenKind<'src>> {
    let start = cursor.pos();
    skip_region(cursor, Region::Word)?;
    let word = cursor.slice(start, cursor.pos());
    if word.bytes().all(|b| b.is_ascii_digit()) && matches!(cursor.peek(), Some('<' | '>')) {
        // out of range numbers are rejected by the parser
        return Ok(TokenKind::IoNumber(word.parse().unwrap_or(u32::MAX)));
    }
    Ok(TokenKind::Word(word))
}

/// Splits `text` into tokens. The last token is always `Eof`.
pub fn tokenize(text: &str) -> ParseResult<Vec<Token<'_>>> {
    let mut cursor = Cursor::new(text, 1);
    let mut tokens = Vec::new();
    loop {
        cursor.skip_blanks();
        if cursor.peek() == Some('#') {
            cursor.skip_comment();
        }
        let lineno = cursor.lineno();
        let kind = match cursor.peek() {
            None => {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    lineno: cursor.eof_lineno(),
                });
                return Ok(tokens);
            }
            Some('\n') => {
                cursor.bump();
                TokenKind::Newline
            }
            Some(_) => match cursor.eat_operator() {
                Some(op) => TokenKind::Operator(op),
                None => word_or_io_number(&mut cursor)?,
            },
        };
        tokens.push(Token { kind, lineno });
    }
}

//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::command::Name;
use crate::parse::tokenizer::{skip_region, skip_single_quoted, Cursor, Region};
use crate::parse::word::{Parameter, ParameterExpansion, SpecialParameter, Word, WordPart};
use crate::parse::{ParseResult, ParserError, SyntaxError};
use std::rc::Rc;

/// Removes the backslashes that quote '`', '\' and '$' inside backquotes, and
/// '"' when the backquotes are inside double quotes
fn unescape_backquoted(commands: &str, inside_double_quotes: bool) -> String {
    let mut result = String::with_capacity(commands.len());
    let mut escaped = false;
    for c in commands.chars() {
        if escaped {
            let removes_backslash =
                matches!(c, '`' | '\\' | '$') || (c == '"' && inside_double_quotes);
            if !removes_backslash {
                result.push('\\');
            }
            result.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            result.push(c);
        }
    }
    if escaped {
        result.push('\\');
    }
    result
}

fn starts_parameter(c: char) -> bool {
    matches!(c, '@' | '*' | '#' | '?' | '-' | '$' | '!' | '_') || c.is_ascii_alphanumeric()
}

/// Collects the parts of a word, joining adjacent literals of the same kind
#[derive(Default)]
struct WordBuilder {
    parts: Vec<WordPart>,
}

impl WordBuilder {
    fn push_str(&mut self, s: &str, quoted: bool) {
        match self.parts.last_mut() {
            Some(WordPart::QuotedLiteral(lit)) if quoted => lit.push_str(s),
            Some(WordPart::UnquotedLiteral(lit)) if !quoted => lit.push_str(s),
            _ if quoted => self.parts.push(WordPart::QuotedLiteral(s.to_string())),
            _ => self.parts.push(WordPart::UnquotedLiteral(s.to_string())),
        }
    }

    fn push_char(&mut self, c: char, quoted: bool) {
        self.push_str(c.encode_utf8(&mut [0; 4]), quoted);
    }

    /// Records an opening quote. A pair of empty quotes still produces a field.
    fn open_quotes(&mut self) {
        if !matches!(self.parts.last(), Some(WordPart::QuotedLiteral(_))) {
            self.parts.push(WordPart::QuotedLiteral(String::new()));
        }
    }

    /// Drops the empty quoted literals, except one if nothing else in the
    /// word is quoted
    fn finish(self) -> Word {
        let has_quoted_text = self.parts.iter().any(|part| match part {
            WordPart::QuotedLiteral(lit) => !lit.is_empty(),
            WordPart::UnquotedLiteral(_) => false,
            WordPart::ParameterExpansion {
                inside_double_quotes,
                ..
            }
            | WordPart::CommandSubstitution {
                inside_double_quotes,
                ..
            } => *inside_double_quotes,
        });
        let mut keep_empty_quotes = !has_quoted_text;
        let mut result = WordBuilder::default();
        for part in self.parts {
            match part {
                WordPart::QuotedLiteral(lit) if lit.is_empty() => {
                    if std::mem::take(&mut keep_empty_quotes) {
                        result.parts.push(WordPart::QuotedLiteral(lit));
                    }
                }
                WordPart::QuotedLiteral(lit) => result.push_str(&lit, true),
                WordPart::UnquotedLiteral(lit) => result.push_str(&lit, false),
                other => result.parts.push(other),
            }
        }
        Word {
            parts: result.parts,
        }
    }
}

struct WordParser<'src> {
    cursor: Cursor<'src>,
    lineno: u32,
}

impl WordParser<'_> {
    fn bad_substitution(&self) -> ParserError {
        ParserError::invalid(self.lineno, "bad substitution")
    }

    /// Parses until the unquoted character `end`, which is not consumed,
    /// or until the end of the text
    fn parse_unquoted(&mut self, word: &mut WordBuilder, end: Option<char>) -> ParseResult<()> {
        while let Some(c) = self.cursor.peek() {
            if Some(c) == end {
                break;
            }
            self.cursor.bump();
            match c {
                '\'' => self.parse_single_quoted(word)?,
                '"' => self.parse_double_quoted(word)?,
                '\\' => match self.cursor.bump() {
                    Some('\n') => {}
                    Some(escaped) => word.push_char(escaped, true),
                    // a trailing backslash stands for itself
                    None => word.push_char('\\', false),
                },
                '$' => self.parse_dollar(word, false)?,
                '`' => self.parse_backquoted(word, false)?,
                other => word.push_char(other, false),
            }
        }
        Ok(())
    }

    fn parse_single_quoted(&mut self, word: &mut WordBuilder) -> ParseResult<()> {
        let start = self.cursor.pos();
        skip_single_quoted(&mut self.cursor)?;
        word.open_quotes();
        word.push_str(self.cursor.slice(start, self.cursor.pos() - 1), true);
        Ok(())
    }

    fn parse_double_quoted(&mut self, word: &mut WordBuilder) -> ParseResult<()> {
        word.open_quotes();
        loop {
            match self.cursor.bump() {
                Some('"') => return Ok(()),
                Some('\\') => match self.cursor.peek() {
                    Some('\n') => {
                        self.cursor.bump();
                    }
                    Some(c @ ('$' | '`' | '"' | '\\')) => {
                        self.cursor.bump();
                        word.push_char(c, true);
                    }
                    _ => word.push_char('\\', true),
                },
                Some('$') => self.parse_dollar(word, true)?,
                Some('`') => self.parse_backquoted(word, true)?,
                Some(c) => word.push_char(c, true),
                None => {
                    return Err(ParserError::new(
                        self.lineno,
                        SyntaxError::Unterminated('"'),
                    ))
                }
            }
        }
    }

    /// the cursor is after '$'
    fn parse_dollar(
        &mut self,
        word: &mut WordBuilder,
        inside_double_quotes: bool,
    ) -> ParseResult<()> {
        let part = match self.cursor.peek() {
            Some('(') => {
                self.cursor.bump();
                let start = self.cursor.pos();
                skip_region(&mut self.cursor, Region::Parens)?;
                WordPart::CommandSubstitution {
                    commands: self.cursor.slice(start, self.cursor.pos() - 1).to_string(),
                    inside_double_quotes,
                }
            }
            Some('{') => {
                self.cursor.bump();
                WordPart::ParameterExpansion {
                    expansion: self.parse_braced_expansion()?,
                    inside_double_quotes,
                }
            }
            Some(c) if starts_parameter(c) => WordPart::ParameterExpansion {
                expansion: ParameterExpansion::Simple(self.parse_parameter(false)?),
                inside_double_quotes,
            },
            // a lone '$' is a literal
            _ => {
                word.push_char('$', inside_double_quotes);
                return Ok(());
            }
        };
        word.parts.push(part);
        Ok(())
    }

    /// the cursor is after the opening '`'
    fn parse_backquoted(
        &mut self,
        word: &mut WordBuilder,
        inside_double_quotes: bool,
    ) -> ParseResult<()> {
        let start = self.cursor.pos();
        skip_region(&mut self.cursor, Region::Backquotes)?;
        let commands = self.cursor.slice(start, self.cursor.pos() - 1);
        word.parts.push(WordPart::CommandSubstitution {
            commands: unescape_backquoted(commands, inside_double_quotes),
            inside_double_quotes,
        });
        Ok(())
    }

    /// Without braces only the first digit of a positional parameter counts
    fn parse_parameter(&mut self, braced: bool) -> ParseResult<Parameter> {
        let special = match self.cursor.peek() {
            Some('@') => SpecialParameter::At,
            Some('*') => SpecialParameter::Asterisk,
            Some('#') => SpecialParameter::Hash,
            Some('?') => SpecialParameter::QuestionMark,
            Some('-') => SpecialParameter::Minus,
            Some('$') => SpecialParameter::Dollar,
            Some('!') => SpecialParameter::Bang,
            Some('0') => SpecialParameter::Zero,
            Some(c) if c.is_ascii_digit() => {
                let mut number = 0u32;
                while let Some(digit) = self.cursor.peek().and_then(|c| c.to_digit(10)) {
                    self.cursor.bump();
                    number = number.saturating_mul(10).saturating_add(digit);
                    if !braced {
                        break;
                    }
                }
                return Ok(Parameter::Number(number));
            }
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {
                let start = self.cursor.pos();
                while self
                    .cursor
                    .peek()
                    .is_some_and(|c| c == '_' || c.is_ascii_alphanumeric())
                {
                    self.cursor.bump();
                }
                let name: Name = Rc::from(self.cursor.slice(start, self.cursor.pos()));
                return Ok(Parameter::Variable(name));
            }
            _ => return Err(self.bad_substitution()),
        };
        self.cursor.bump();
        Ok(Parameter::Special(special))
    }

    fn expect_closing_brace(&mut self) -> ParseResult<()> {
        if self.cursor.eat('}') {
            Ok(())
        } else {
            Err(self.bad_substitution())
        }
    }

    /// the word after an expansion operator, up to the closing brace
    fn parse_operand_word(&mut self) -> ParseResult<Word> {
        let mut word = WordBuilder::default();
        self.parse_unquoted(&mut word, Some('}'))?;
        self.expect_closing_brace()?;
        Ok(word.finish())
    }

    /// the cursor is after "${"
    fn parse_braced_expansion(&mut self) -> ParseResult<ParameterExpansion> {
        // `${#}` is the number of positional parameters, not a length
        if self.cursor.peek() == Some('#') && self.cursor.peek_second() != Some('}') {
            self.cursor.bump();
            let parameter = self.parse_parameter(true)?;
            self.expect_closing_brace()?;
            return Ok(ParameterExpansion::StrLen(parameter));
        }
        let parameter = self.parse_parameter(true)?;
        let op = match self.cursor.bump() {
            Some('}') => return Ok(ParameterExpansion::Simple(parameter)),
            Some(op @ ('%' | '#')) => {
                let remove_largest = self.cursor.eat(op);
                return Ok(ParameterExpansion::RemovePattern {
                    parameter,
                    pattern: self.parse_operand_word()?,
                    remove_largest,
                    remove_prefix: op == '#',
                });
            }
            op => op,
        };
        let colon = op == Some(':');
        let op = if colon { self.cursor.bump() } else { op };
        let expansion = match op {
            Some('-') => ParameterExpansion::UnsetUseDefault {
                parameter,
                word: self.parse_operand_word()?,
                default_on_null: colon,
            },
            Some('=') => match parameter {
                Parameter::Variable(variable) => ParameterExpansion::UnsetAssignDefault {
                    variable,
                    word: self.parse_operand_word()?,
                    assign_on_null: colon,
                },
                other => {
                    return Err(ParserError::invalid(
                        self.lineno,
                        format!("${other}: cannot assign in this way"),
                    ))
                }
            },
            Some('?') => ParameterExpansion::UnsetError {
                parameter,
                word: self.parse_operand_word()?,
                error_on_null: colon,
            },
            Some('+') => ParameterExpansion::SetUseAlternative {
                parameter,
                word: self.parse_operand_word()?,
                substitute_null_with_word: !colon,
            },
            _ => return Err(self.bad_substitution()),
        };
        Ok(expansion)
    }
}

/// Parses the raw text of a word token into its parts. Quotes are removed and
/// recorded in the part types.
pub fn parse_word(text: &str, lineno: u32) -> ParseResult<Word> {
    let mut parser = WordParser {
        cursor: Cursor::new(text, lineno),
        lineno,
    };
    let mut word = WordBuilder::default();
    parser.parse_unquoted(&mut word, None)?;
    Ok(word.finish())
}

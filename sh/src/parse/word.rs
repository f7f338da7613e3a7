//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::command::Name;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialParameter {
    At,
    Asterisk,
    Hash,
    QuestionMark,
    Minus,
    Dollar,
    Bang,
    Zero,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Number(u32),
    Variable(Name),
    Special(SpecialParameter),
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Parameter::Number(n) => write!(f, "{n}"),
            Parameter::Variable(name) => f.write_str(name),
            Parameter::Special(special) => f.write_str(match special {
                SpecialParameter::At => "@",
                SpecialParameter::Asterisk => "*",
                SpecialParameter::Hash => "#",
                SpecialParameter::QuestionMark => "?",
                SpecialParameter::Minus => "-",
                SpecialParameter::Dollar => "$",
                SpecialParameter::Bang => "!",
                SpecialParameter::Zero => "0",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterExpansion {
    // $parameter or ${parameter}
    Simple(Parameter),
    // ${parameter[:]-[word]}
    UnsetUseDefault {
        parameter: Parameter,
        word: Word,
        default_on_null: bool,
    },
    // ${parameter[:]=[word]}
    UnsetAssignDefault {
        variable: Name,
        word: Word,
        assign_on_null: bool,
    },
    // ${parameter[:]?[word]}
    UnsetError {
        parameter: Parameter,
        word: Word,
        error_on_null: bool,
    },
    // ${parameter[:]+[word]}
    SetUseAlternative {
        parameter: Parameter,
        word: Word,
        substitute_null_with_word: bool,
    },
    // ${#parameter}
    StrLen(Parameter),
    // ${parameter(%[%]|#[#])[word]}
    RemovePattern {
        parameter: Parameter,
        pattern: Word,
        /// otherwise remove smallest
        remove_largest: bool,
        /// otherwise remove suffix
        remove_prefix: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    UnquotedLiteral(String),
    QuotedLiteral(String),
    ParameterExpansion {
        expansion: ParameterExpansion,
        inside_double_quotes: bool,
    },
    CommandSubstitution {
        commands: String,
        inside_double_quotes: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

impl Word {
    /// Returns the literal contents of the word if it contains no expansions
    pub fn as_literal(&self) -> Option<String> {
        let mut result = String::new();
        for part in &self.parts {
            match part {
                WordPart::UnquotedLiteral(lit) | WordPart::QuotedLiteral(lit) => {
                    result.push_str(lit)
                }
                _ => return None,
            }
        }
        Some(result)
    }
}

fn write_escaped_unquoted(f: &mut Formatter<'_>, text: &str) -> std::fmt::Result {
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '\'' | '"' | '`' | '$' | ' ' | '\t' | '\n' | '|' | '&' | ';' | '<' | '>' | '('
                | ')'
        ) {
            write!(f, "\\{c}")?;
        } else {
            write!(f, "{c}")?;
        }
    }
    Ok(())
}

fn write_double_quoted_contents(f: &mut Formatter<'_>, text: &str) -> std::fmt::Result {
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '`' | '$') {
            write!(f, "\\{c}")?;
        } else {
            write!(f, "{c}")?;
        }
    }
    Ok(())
}

fn write_quoted(f: &mut Formatter<'_>, text: &str) -> std::fmt::Result {
    if text.contains('\'') {
        f.write_str("\"")?;
        write_double_quoted_contents(f, text)?;
        f.write_str("\"")
    } else {
        write!(f, "'{text}'")
    }
}

impl Display for ParameterExpansion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let colon = |b: bool| if b { ":" } else { "" };
        match self {
            ParameterExpansion::Simple(parameter) => write!(f, "${{{parameter}}}"),
            ParameterExpansion::UnsetUseDefault {
                parameter,
                word,
                default_on_null,
            } => write!(f, "${{{parameter}{}-{word}}}", colon(*default_on_null)),
            ParameterExpansion::UnsetAssignDefault {
                variable,
                word,
                assign_on_null,
            } => write!(f, "${{{variable}{}={word}}}", colon(*assign_on_null)),
            ParameterExpansion::UnsetError {
                parameter,
                word,
                error_on_null,
            } => write!(f, "${{{parameter}{}?{word}}}", colon(*error_on_null)),
            ParameterExpansion::SetUseAlternative {
                parameter,
                word,
                substitute_null_with_word,
            } => write!(
                f,
                "${{{parameter}{}+{word}}}",
                colon(!*substitute_null_with_word)
            ),
            ParameterExpansion::StrLen(parameter) => write!(f, "${{#{parameter}}}"),
            ParameterExpansion::RemovePattern {
                parameter,
                pattern,
                remove_largest,
                remove_prefix,
            } => {
                let op = if *remove_prefix { "#" } else { "%" };
                if *remove_largest {
                    write!(f, "${{{parameter}{op}{op}{pattern}}}")
                } else {
                    write!(f, "${{{parameter}{op}{pattern}}}")
                }
            }
        }
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for part in &self.parts {
            match part {
                WordPart::UnquotedLiteral(lit) => write_escaped_unquoted(f, lit)?,
                WordPart::QuotedLiteral(lit) => write_quoted(f, lit)?,
                WordPart::ParameterExpansion {
                    expansion,
                    inside_double_quotes,
                } => {
                    if *inside_double_quotes {
                        write!(f, "\"{expansion}\"")?
                    } else {
                        write!(f, "{expansion}")?
                    }
                }
                WordPart::CommandSubstitution {
                    commands,
                    inside_double_quotes,
                } => {
                    if *inside_double_quotes {
                        write!(f, "\"$({commands})\"")?
                    } else {
                        write!(f, "$({commands})")?
                    }
                }
            }
        }
        Ok(())
    }
}

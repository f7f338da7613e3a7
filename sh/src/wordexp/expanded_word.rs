//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandedWordPart {
    QuotedLiteral(String),
    UnquotedLiteral(String),
    /// unquoted result of an expansion, subject to field splitting
    GeneratedUnquotedLiteral(String),
    // terminates a field
    FieldEnd,
}

impl ExpandedWordPart {
    pub fn new(value: String, quoted: bool, generated: bool) -> Self {
        if quoted {
            ExpandedWordPart::QuotedLiteral(value)
        } else if generated {
            ExpandedWordPart::GeneratedUnquotedLiteral(value)
        } else {
            ExpandedWordPart::UnquotedLiteral(value)
        }
    }
}

/// Word that has undergone parameter expansion and command substitution,
/// but not field splitting or quote removal.
///
/// Adjacent parts are of different types.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ExpandedWord {
    parts: Vec<ExpandedWordPart>,
}

impl Display for ExpandedWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for part in &self.parts {
            match part {
                ExpandedWordPart::UnquotedLiteral(s)
                | ExpandedWordPart::QuotedLiteral(s)
                | ExpandedWordPart::GeneratedUnquotedLiteral(s) => f.write_str(s)?,
                ExpandedWordPart::FieldEnd => {}
            }
        }
        Ok(())
    }
}

impl From<ExpandedWord> for String {
    fn from(value: ExpandedWord) -> Self {
        value.to_string()
    }
}

impl IntoIterator for ExpandedWord {
    type Item = ExpandedWordPart;
    type IntoIter = std::vec::IntoIter<ExpandedWordPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl<'a> IntoIterator for &'a ExpandedWord {
    type Item = &'a ExpandedWordPart;
    type IntoIter = std::slice::Iter<'a, ExpandedWordPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

impl ExpandedWord {
    pub fn unquoted_literal<S: Into<String>>(s: S) -> Self {
        Self {
            parts: vec![ExpandedWordPart::UnquotedLiteral(s.into())],
        }
    }

    pub fn append<S: AsRef<str> + Into<String>>(
        &mut self,
        value: S,
        quoted: bool,
        generated: bool,
    ) {
        match self.parts.last_mut() {
            Some(ExpandedWordPart::GeneratedUnquotedLiteral(last)) if generated && !quoted => {
                last.push_str(value.as_ref())
            }
            Some(ExpandedWordPart::UnquotedLiteral(last)) if !generated && !quoted => {
                last.push_str(value.as_ref())
            }
            Some(ExpandedWordPart::QuotedLiteral(last)) if quoted => last.push_str(value.as_ref()),
            _ => self
                .parts
                .push(ExpandedWordPart::new(value.into(), quoted, generated)),
        }
    }

    /// Terminates the current field. Used for `"$@"`, where every positional
    /// parameter becomes a separate field even inside double quotes.
    pub fn end_field(&mut self) {
        self.parts.push(ExpandedWordPart::FieldEnd);
    }

    pub fn extend(&mut self, other: Self) {
        for part in other.parts {
            match part {
                ExpandedWordPart::QuotedLiteral(lit) => self.append(lit, true, false),
                ExpandedWordPart::UnquotedLiteral(lit) => self.append(lit, false, false),
                ExpandedWordPart::GeneratedUnquotedLiteral(lit) => self.append(lit, false, true),
                ExpandedWordPart::FieldEnd => self.end_field(),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }
}

#[cfg(test)]
impl ExpandedWord {
    pub fn quoted_literal<S: Into<String>>(s: S) -> Self {
        Self {
            parts: vec![ExpandedWordPart::QuotedLiteral(s.into())],
        }
    }

    pub fn generated_unquoted_literal<S: Into<String>>(s: S) -> Self {
        Self {
            parts: vec![ExpandedWordPart::GeneratedUnquotedLiteral(s.into())],
        }
    }

    pub fn from_parts(parts: Vec<ExpandedWordPart>) -> Self {
        Self { parts }
    }
}

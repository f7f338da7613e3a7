//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::wordexp::expanded_word::{ExpandedWord, ExpandedWordPart};
use regex::Regex;

fn push_escaped(regex_str: &mut String, c: char) {
    let mut buf = [0u8; 4];
    regex_str.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

fn push_escaped_in_class(regex_str: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
        regex_str.push('\\');
    }
    regex_str.push(c);
}

#[derive(Clone, Copy)]
struct PatternChar {
    c: char,
    quoted: bool,
}

impl PatternChar {
    fn is(&self, c: char) -> bool {
        !self.quoted && self.c == c
    }
}

/// Flattens the parts of `word`, marking the characters that were quoted or
/// escaped with a backslash
fn pattern_chars(word: &ExpandedWord) -> Vec<PatternChar> {
    let mut result = Vec::new();
    for part in word {
        match part {
            ExpandedWordPart::QuotedLiteral(lit) => {
                result.extend(lit.chars().map(|c| PatternChar { c, quoted: true }))
            }
            ExpandedWordPart::UnquotedLiteral(lit)
            | ExpandedWordPart::GeneratedUnquotedLiteral(lit) => {
                let mut chars = lit.chars();
                while let Some(c) = chars.next() {
                    if c == '\\' {
                        let c = chars.next().unwrap_or('\\');
                        result.push(PatternChar { c, quoted: true });
                    } else {
                        result.push(PatternChar { c, quoted: false });
                    }
                }
            }
            ExpandedWordPart::FieldEnd => {}
        }
    }
    result
}

/// Translates the bracket expression starting after `[`. Returns the
/// regex class and the number of characters it spans, or `None` if the
/// expression is not terminated, in which case the `[` is matched literally.
fn bracket_expression_to_regex(chars: &[PatternChar]) -> Option<(String, usize)> {
    let mut regex_str = String::from("[");
    let mut i = 0;
    if chars.first().is_some_and(|pc| pc.is('!') || pc.is('^')) {
        regex_str.push('^');
        i += 1;
    }
    let first = i;
    while let Some(pc) = chars.get(i) {
        if pc.is(']') && i != first {
            regex_str.push(']');
            return Some((regex_str, i + 1));
        }
        if pc.is('[') && chars.get(i + 1).is_some_and(|next| next.is(':')) {
            // character class, like [:alpha:]
            let len = chars[i + 2..]
                .windows(2)
                .position(|w| w[0].is(':') && w[1].is(']'))?;
            regex_str.push_str("[:");
            regex_str.extend(chars[i + 2..i + 2 + len].iter().map(|pc| pc.c));
            regex_str.push_str(":]");
            i += len + 4;
            continue;
        }
        let is_range = pc.is('-')
            && i != first
            && chars.get(i + 1).is_some_and(|next| !next.is(']'));
        if is_range {
            regex_str.push('-');
        } else {
            push_escaped_in_class(&mut regex_str, pc.c);
        }
        i += 1;
    }
    None
}

fn glob_to_regex_into(regex_str: &mut String, chars: &[PatternChar]) {
    let mut i = 0;
    while let Some(pc) = chars.get(i) {
        i += 1;
        if pc.quoted {
            push_escaped(regex_str, pc.c);
            continue;
        }
        match pc.c {
            '*' => regex_str.push_str(".*"),
            '?' => regex_str.push('.'),
            '[' => match bracket_expression_to_regex(&chars[i..]) {
                Some((class, len)) => {
                    regex_str.push_str(&class);
                    i += len;
                }
                None => push_escaped(regex_str, '['),
            },
            other => push_escaped(regex_str, other),
        }
    }
}

/// Shell pattern, as used by `case` and the pattern removal expansions.
/// Quoted characters only match themselves.
pub struct Pattern {
    pattern_string: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(word: &ExpandedWord) -> Result<Self, String> {
        let mut regex_str = String::from("^(?s:");
        glob_to_regex_into(&mut regex_str, &pattern_chars(word));
        regex_str.push_str(")$");
        let regex = Regex::new(&regex_str).map_err(|e| format!("invalid pattern: {e}"))?;
        Ok(Self {
            pattern_string: word.to_string(),
            regex,
        })
    }

    pub fn matches(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }

    pub fn remove_largest_prefix(&self, s: String) -> String {
        let prefix_end = char_boundaries(&s)
            .rev()
            .find(|end| self.matches(&s[..*end]));
        remove_prefix(s, prefix_end)
    }

    pub fn remove_shortest_prefix(&self, s: String) -> String {
        let prefix_end = char_boundaries(&s).find(|end| self.matches(&s[..*end]));
        remove_prefix(s, prefix_end)
    }

    pub fn remove_largest_suffix(&self, s: String) -> String {
        let suffix_start = char_boundaries(&s).find(|start| self.matches(&s[*start..]));
        remove_suffix(s, suffix_start)
    }

    pub fn remove_shortest_suffix(&self, s: String) -> String {
        let suffix_start = char_boundaries(&s)
            .rev()
            .find(|start| self.matches(&s[*start..]));
        remove_suffix(s, suffix_start)
    }
}

fn char_boundaries(s: &str) -> impl DoubleEndedIterator<Item = usize> + '_ {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
}

fn remove_prefix(mut s: String, prefix_end: Option<usize>) -> String {
    if let Some(end) = prefix_end {
        s.drain(..end);
    }
    s
}

fn remove_suffix(mut s: String, suffix_start: Option<usize>) -> String {
    if let Some(start) = suffix_start {
        s.truncate(start);
    }
    s
}

impl From<Pattern> for String {
    fn from(value: Pattern) -> Self {
        value.pattern_string
    }
}

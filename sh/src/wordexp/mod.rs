//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::word::{Parameter, ParameterExpansion, SpecialParameter, Word, WordPart};
use crate::shell::{CommandExecutionError, Shell};
use crate::wordexp::expanded_word::{ExpandedWord, ExpandedWordPart};
use crate::wordexp::parameter::expand_parameter_into;
use crate::wordexp::pattern::Pattern;

pub mod expanded_word;
mod parameter;
pub mod pattern;

pub type ExpansionResult<T> = Result<T, CommandExecutionError>;

fn is_ifs_whitespace(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\n'
}

/// Splits the unquoted results of expansions on the characters of `ifs`.
fn split_fields(expanded_word: ExpandedWord, ifs: Option<&str>) -> Vec<ExpandedWord> {
    if expanded_word.is_empty() {
        return Vec::new();
    }
    // > If the IFS variable is unset [..], its value shall be considered to contain the three
    // > single-byte characters <space>, <tab>, and <newline>
    let ifs = ifs.unwrap_or(" \t\n");

    let mut result = Vec::with_capacity(expanded_word.len());
    let mut last_word = ExpandedWord::default();
    // set when IFS whitespace terminated the previous field, so that a following
    // non-whitespace delimiter does not produce an empty field
    let mut field_ended_by_whitespace = false;
    for part in expanded_word.into_iter() {
        match part {
            // > Fields which contain no results from expansions shall not be affected by
            // > field splitting
            ExpandedWordPart::UnquotedLiteral(lit) => {
                last_word.append(lit, false, false);
                field_ended_by_whitespace = false;
            }
            ExpandedWordPart::QuotedLiteral(lit) => {
                last_word.append(lit, true, false);
                field_ended_by_whitespace = false;
            }
            ExpandedWordPart::FieldEnd => {
                if !last_word.is_empty() {
                    result.push(std::mem::take(&mut last_word));
                }
                field_ended_by_whitespace = false;
            }
            ExpandedWordPart::GeneratedUnquotedLiteral(lit) if ifs.is_empty() => {
                // > If the IFS variable is set and has an empty string as its value, no field
                // > splitting shall occur
                if !lit.is_empty() {
                    last_word.append(lit, false, false);
                }
            }
            ExpandedWordPart::GeneratedUnquotedLiteral(lit) => {
                let mut accumulator = String::new();
                for c in lit.chars() {
                    if !ifs.contains(c) {
                        accumulator.push(c);
                        field_ended_by_whitespace = false;
                        continue;
                    }
                    if !accumulator.is_empty() {
                        last_word.append(std::mem::take(&mut accumulator), false, false);
                    }
                    if is_ifs_whitespace(c) {
                        if !last_word.is_empty() {
                            result.push(std::mem::take(&mut last_word));
                            field_ended_by_whitespace = true;
                        }
                    } else {
                        if !last_word.is_empty() {
                            result.push(std::mem::take(&mut last_word));
                        } else if !field_ended_by_whitespace {
                            result.push(ExpandedWord::default());
                        }
                        field_ended_by_whitespace = false;
                    }
                }
                if !accumulator.is_empty() {
                    last_word.append(accumulator, false, false);
                }
            }
        }
    }
    if !last_word.is_empty() {
        result.push(last_word);
    }
    result
}

/// Performs parameter expansion and command substitution on `word`.
///
/// `nested` is set for the words inside parameter expansions (`${a:-word}`),
/// whose unquoted literals are the result of an expansion and therefore
/// subject to field splitting.
fn simple_word_expansion_into(
    result: &mut ExpandedWord,
    word: &Word,
    inside_double_quotes: bool,
    nested: bool,
    field_splitting_will_be_performed: bool,
    shell: &mut Shell,
) -> ExpansionResult<()> {
    for part in &word.parts {
        match part {
            WordPart::UnquotedLiteral(lit) => {
                result.append(lit.as_str(), inside_double_quotes, nested)
            }
            WordPart::QuotedLiteral(lit) => result.append(lit.as_str(), true, nested),
            WordPart::ParameterExpansion {
                expansion,
                inside_double_quotes: quoted,
            } => {
                let quoted = *quoted || inside_double_quotes;
                expand_parameter_into(
                    result,
                    expansion,
                    quoted,
                    field_splitting_will_be_performed,
                    shell,
                )?;
                // a quoted expansion is a field even if it is empty, except for `"$@"`
                let is_at = matches!(
                    expansion,
                    ParameterExpansion::Simple(Parameter::Special(SpecialParameter::At))
                );
                if quoted && !is_at {
                    result.append("", true, true);
                }
            }
            WordPart::CommandSubstitution {
                commands,
                inside_double_quotes: quoted,
            } => {
                let output = shell.execute_in_subshell(commands)?;
                log::trace!("command substitution `{commands}` produced {output:?}");
                result.append(output, *quoted || inside_double_quotes, true);
            }
        }
    }
    Ok(())
}

/// Expands `word` into a single string, without field splitting.
/// Used for assignment values, redirection targets and the word of a `case`.
pub fn expand_word_to_string(word: &Word, shell: &mut Shell) -> ExpansionResult<String> {
    let mut expanded_word = ExpandedWord::default();
    simple_word_expansion_into(&mut expanded_word, word, false, false, false, shell)?;
    Ok(expanded_word.to_string())
}

/// Performs the full expansion of a command word, producing zero or more fields.
pub fn expand_word(word: &Word, shell: &mut Shell) -> ExpansionResult<Vec<String>> {
    let mut expanded_word = ExpandedWord::default();
    simple_word_expansion_into(&mut expanded_word, word, false, false, true, shell)?;
    let ifs = shell.environment.get_str_value("IFS");
    let fields = split_fields(expanded_word, ifs)
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    log::trace!("expanded `{word}` into {fields:?}");
    Ok(fields)
}

pub fn word_to_pattern(word: &Word, shell: &mut Shell) -> ExpansionResult<Pattern> {
    let mut expanded_word = ExpandedWord::default();
    simple_word_expansion_into(&mut expanded_word, word, false, false, false, shell)?;
    Pattern::new(&expanded_word).map_err(CommandExecutionError::ExpansionError)
}

//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use crate::parse::word::{Parameter, ParameterExpansion, SpecialParameter, Word};
use crate::shell::environment::VariableState;
use crate::shell::{CommandExecutionError, Shell};
use crate::wordexp::{
    expand_word_to_string, simple_word_expansion_into, word_to_pattern, ExpandedWord,
    ExpansionResult,
};

/// Value of a parameter before any operator is applied
enum ParameterValue {
    Unset,
    Scalar(String),
    /// `$@` and `$*`. `separator` joins the values when they are not
    /// expanded to separate fields.
    Positional {
        values: Vec<String>,
        separator: String,
        star: bool,
    },
}

#[derive(Clone, Copy)]
struct Quoting {
    inside_double_quotes: bool,
    field_splitting_will_be_performed: bool,
}

impl ParameterValue {
    fn lookup(parameter: &Parameter, shell: &Shell) -> Self {
        let positional = |star: bool| {
            let separator = if star {
                // the first character of IFS, a space if IFS is unset
                shell
                    .environment
                    .get_str_value("IFS")
                    .map_or_else(|| " ".to_string(), |ifs| ifs.chars().take(1).collect())
            } else {
                " ".to_string()
            };
            ParameterValue::Positional {
                values: shell.positional_parameters.clone(),
                separator,
                star,
            }
        };
        match parameter {
            Parameter::Number(0) | Parameter::Special(SpecialParameter::Zero) => {
                ParameterValue::Scalar(shell.program_name.clone())
            }
            Parameter::Number(n) => shell
                .positional_parameters
                .get(*n as usize - 1)
                .map_or(ParameterValue::Unset, |value| {
                    ParameterValue::Scalar(value.clone())
                }),
            Parameter::Variable(name) => shell
                .environment
                .get_str_value(name)
                .map_or(ParameterValue::Unset, |value| {
                    ParameterValue::Scalar(value.to_string())
                }),
            Parameter::Special(SpecialParameter::At) => positional(false),
            Parameter::Special(SpecialParameter::Asterisk) => positional(true),
            Parameter::Special(SpecialParameter::Hash) => {
                ParameterValue::Scalar(shell.positional_parameters.len().to_string())
            }
            Parameter::Special(SpecialParameter::QuestionMark) => {
                ParameterValue::Scalar(shell.last_pipeline_exit_status.to_string())
            }
            Parameter::Special(SpecialParameter::Dollar) => {
                ParameterValue::Scalar(shell.shell_pid.to_string())
            }
            // no option of `set` is supported, and there are no background jobs
            Parameter::Special(SpecialParameter::Minus | SpecialParameter::Bang) => {
                ParameterValue::Scalar(String::new())
            }
        }
    }

    /// Unset, or null when `null_counts` is set
    fn is_missing(&self, null_counts: bool) -> bool {
        match self {
            ParameterValue::Unset => true,
            ParameterValue::Scalar(value) => null_counts && value.is_empty(),
            ParameterValue::Positional { values, .. } => null_counts && values.is_empty(),
        }
    }

    fn append_to(self, word: &mut ExpandedWord, quoting: Quoting) {
        let quoted = quoting.inside_double_quotes;
        match self {
            ParameterValue::Unset => {}
            ParameterValue::Scalar(value) => word.append(value, quoted, true),
            // "$*" is always a single field
            ParameterValue::Positional { values, star, .. }
                if quoting.field_splitting_will_be_performed && !(star && quoted) =>
            {
                for (i, value) in values.into_iter().enumerate() {
                    if i > 0 {
                        word.end_field();
                    }
                    word.append(value, quoted, true);
                }
            }
            ParameterValue::Positional {
                values, separator, ..
            } => word.append(values.join(&separator), quoted, true),
        }
    }

    fn into_string(self) -> String {
        match self {
            ParameterValue::Unset => String::new(),
            ParameterValue::Scalar(value) => value,
            ParameterValue::Positional {
                values, separator, ..
            } => values.join(&separator),
        }
    }
}

/// Expands the word after an operator, like `word` in `${a:-word}`
fn expand_operand_into(
    expanded_word: &mut ExpandedWord,
    word: &Word,
    quoting: Quoting,
    shell: &mut Shell,
) -> ExpansionResult<()> {
    simple_word_expansion_into(
        expanded_word,
        word,
        quoting.inside_double_quotes,
        true,
        quoting.field_splitting_will_be_performed,
        shell,
    )
}

pub fn expand_parameter_into(
    expanded_word: &mut ExpandedWord,
    parameter_expansion: &ParameterExpansion,
    inside_double_quotes: bool,
    field_splitting_will_be_performed: bool,
    shell: &mut Shell,
) -> ExpansionResult<()> {
    let quoting = Quoting {
        inside_double_quotes,
        field_splitting_will_be_performed,
    };
    match parameter_expansion {
        ParameterExpansion::Simple(parameter) => {
            ParameterValue::lookup(parameter, shell).append_to(expanded_word, quoting)
        }
        ParameterExpansion::UnsetUseDefault {
            parameter,
            word,
            default_on_null,
        } => {
            let value = ParameterValue::lookup(parameter, shell);
            if value.is_missing(*default_on_null) {
                expand_operand_into(expanded_word, word, quoting, shell)?;
            } else {
                value.append_to(expanded_word, quoting);
            }
        }
        ParameterExpansion::UnsetAssignDefault {
            variable,
            word,
            assign_on_null,
        } => {
            let value = match shell.environment.get(variable) {
                VariableState::Set(value) => value.to_string(),
                VariableState::Null if !*assign_on_null => String::new(),
                _ => {
                    let value = expand_word_to_string(word, shell)?;
                    shell.environment.set(variable.to_string(), value.clone())?;
                    value
                }
            };
            expanded_word.append(value, inside_double_quotes, true);
        }
        ParameterExpansion::UnsetError {
            parameter,
            word,
            error_on_null,
        } => {
            let value = ParameterValue::lookup(parameter, shell);
            if value.is_missing(*error_on_null) {
                let message = match (word.parts.is_empty(), *error_on_null) {
                    (false, _) => expand_word_to_string(word, shell)?,
                    (true, true) => "parameter null or not set".to_string(),
                    (true, false) => "parameter not set".to_string(),
                };
                return Err(CommandExecutionError::ParameterError {
                    name: parameter.to_string(),
                    message,
                });
            }
            value.append_to(expanded_word, quoting);
        }
        ParameterExpansion::SetUseAlternative {
            parameter,
            word,
            substitute_null_with_word,
        } => {
            // `+` replaces a null value too, `:+` only a non null one
            if !ParameterValue::lookup(parameter, shell).is_missing(!*substitute_null_with_word) {
                expand_operand_into(expanded_word, word, quoting, shell)?;
            }
        }
        ParameterExpansion::StrLen(parameter) => {
            let len = match ParameterValue::lookup(parameter, shell) {
                ParameterValue::Positional { values, .. } => values.len(),
                value => value.into_string().chars().count(),
            };
            expanded_word.append(len.to_string(), inside_double_quotes, true);
        }
        ParameterExpansion::RemovePattern {
            parameter,
            pattern,
            remove_prefix,
            remove_largest,
        } => {
            let value = ParameterValue::lookup(parameter, shell).into_string();
            let pattern = word_to_pattern(pattern, shell)?;
            let result = match (*remove_prefix, *remove_largest) {
                (true, true) => pattern.remove_largest_prefix(value),
                (true, false) => pattern.remove_shortest_prefix(value),
                (false, true) => pattern.remove_largest_suffix(value),
                (false, false) => pattern.remove_shortest_suffix(value),
            };
            expanded_word.append(result, inside_double_quotes, true);
        }
    }
    Ok(())
}

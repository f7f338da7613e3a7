//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Value {
    /// `None` if `Value` is unset
    pub value: Option<String>,
    pub export: bool,
    pub readonly: bool,
}

impl Value {
    pub fn new_exported(value: String) -> Self {
        Value {
            value: Some(value),
            export: true,
            readonly: false,
        }
    }

    pub fn new(value: String) -> Self {
        Value {
            value: Some(value),
            export: false,
            readonly: false,
        }
    }

    pub fn export_or(&mut self, value: bool) {
        self.export = self.export || value;
    }
}

/// Result of looking up a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableState<'a> {
    Unset,
    /// set to the empty string
    Null,
    Set(&'a str),
}

pub type GlobalScope = HashMap<String, Value>;
pub type LocalScope = HashMap<String, String>;

/// Shell variables.
///
/// Cloning an environment produces an independent snapshot, used for
/// subshells and command substitutions.
#[derive(Default, Clone, Debug)]
pub struct Environment {
    global_scope: GlobalScope,
    /// Overlays created by assignments before a command (`var=value cmd`).
    /// Variables in a local scope are implicitly exported, so `var` is also
    /// available to every command called from `cmd` if it is a function.
    local_scopes: Vec<LocalScope>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}: readonly variable")]
pub struct CannotModifyReadonly(pub String);

impl Environment {
    fn check_not_readonly(&self, name: &str) -> Result<(), CannotModifyReadonly> {
        if self.global_scope.get(name).is_some_and(|var| var.readonly) {
            return Err(CannotModifyReadonly(name.to_string()));
        }
        Ok(())
    }

    /// Assigns `value` to `name` in the global scope, removing it from every overlay
    pub fn set_global(
        &mut self,
        name: String,
        value: String,
    ) -> Result<&mut Value, CannotModifyReadonly> {
        self.remove_from_local_scopes(&name);
        match self.global_scope.entry(name) {
            Entry::Occupied(mut e) => {
                if e.get().readonly {
                    return Err(CannotModifyReadonly(e.key().clone()));
                }
                e.get_mut().value = Some(value);
                Ok(e.into_mut())
            }
            Entry::Vacant(e) => Ok(e.insert(Value::new(value))),
        }
    }

    pub fn set_global_forced(&mut self, name: String, value: String) -> &mut Value {
        self.remove_from_local_scopes(&name);
        let var = self.global_scope.entry(name).or_default();
        var.value = Some(value);
        var
    }

    pub fn set_global_if_unset(&mut self, name: &str, value: &str) {
        if self.get_str_value(name).is_none() {
            self.set_global_forced(name.to_string(), value.to_string());
        }
    }

    /// Assigns `value` to `name` in the innermost scope where `name` is defined.
    /// Names not bound by any overlay are assigned in the global scope.
    pub fn set(&mut self, name: String, value: String) -> Result<(), CannotModifyReadonly> {
        for local_scope in self.local_scopes.iter_mut().rev() {
            if let Some(existing) = local_scope.get_mut(&name) {
                *existing = value;
                return Ok(());
            }
        }
        match self.global_scope.entry(name) {
            Entry::Occupied(mut e) => {
                if e.get().readonly {
                    return Err(CannotModifyReadonly(e.key().clone()));
                }
                e.get_mut().value = Some(value);
            }
            Entry::Vacant(e) => {
                e.insert(Value::new(value));
            }
        }
        Ok(())
    }

    /// Binds `name` in the innermost overlay
    pub fn set_local(&mut self, name: String, value: String) -> Result<(), CannotModifyReadonly> {
        self.check_not_readonly(&name)?;
        match self.local_scopes.last_mut() {
            Some(innermost_scope) => {
                innermost_scope.insert(name, value);
                Ok(())
            }
            None => self.set(name, value),
        }
    }

    pub fn get(&self, name: &str) -> VariableState {
        match self.get_str_value(name) {
            None => VariableState::Unset,
            Some("") => VariableState::Null,
            Some(value) => VariableState::Set(value),
        }
    }

    pub fn get_str_value(&self, name: &str) -> Option<&str> {
        for local_scope in self.local_scopes.iter().rev() {
            if let Some(value) = local_scope.get(name) {
                return Some(value.as_str());
            }
        }
        self.global_scope
            .get(name)
            .and_then(|val| val.value.as_deref())
    }

    /// Moves `name` out of the overlays into the global scope and returns it,
    /// creating an unset variable if it doesn't exist.
    pub fn promote_local_or_get_global(&mut self, name: String) -> &mut Value {
        let mut local_value = None;
        for local_scope in self.local_scopes.iter_mut().rev() {
            if let Some(value) = local_scope.remove(&name) {
                local_value.get_or_insert(value);
            }
        }
        let var = self.global_scope.entry(name).or_default();
        if local_value.is_some() && !var.readonly {
            var.value = local_value;
        }
        var
    }

    pub fn unset(&mut self, name: &str) -> Result<(), CannotModifyReadonly> {
        self.check_not_readonly(name)?;
        self.remove_from_local_scopes(name);
        self.global_scope.remove(name);
        Ok(())
    }

    fn remove_from_local_scopes(&mut self, var: &str) {
        for local_scope in &mut self.local_scopes {
            local_scope.remove(var);
        }
    }

    pub fn push_scope(&mut self) {
        self.local_scopes.push(LocalScope::new());
    }

    pub fn pop_scope(&mut self) {
        self.local_scopes.pop();
    }

    pub fn global_scope(&self) -> &GlobalScope {
        &self.global_scope
    }

    /// Variables passed to the environment of executed programs
    pub fn exported(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut exported = HashMap::new();
        for (name, var) in &self.global_scope {
            if var.export {
                if let Some(value) = &var.value {
                    exported.insert(name.as_str(), value.as_str());
                }
            }
        }
        // inner scopes shadow outer ones
        for local_scope in &self.local_scopes {
            for (name, value) in local_scope {
                exported.insert(name.as_str(), value.as_str());
            }
        }
        exported.into_iter()
    }
}

impl<I: IntoIterator<Item = (String, Value)>> From<I> for Environment {
    fn from(value: I) -> Self {
        Self {
            global_scope: value.into_iter().collect(),
            local_scopes: Vec::default(),
        }
    }
}

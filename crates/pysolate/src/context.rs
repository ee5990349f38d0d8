// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Snapshot of the process variables the bootstrap reads, and the changes it
//! hands to the next process image.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Command;

#[cfg(test)]
#[path = "./context_test.rs"]
mod context_test;

/// Active-environment marker.
pub const VIRTUAL_ENV: &str = "VIRTUAL_ENV";
/// Interpreter search list.
pub const PATH: &str = "PATH";
pub const PYTHONHOME: &str = "PYTHONHOME";
/// Saved values written by environment activation.
pub const OLD_VIRTUAL_PATH: &str = "_OLD_VIRTUAL_PATH";
pub const OLD_VIRTUAL_PYTHONHOME: &str = "_OLD_VIRTUAL_PYTHONHOME";

/// Version-manager root directory.
pub const PYENV_ROOT: &str = "PYENV_ROOT";
pub const PYENV_VIRTUAL_ENV: &str = "PYENV_VIRTUAL_ENV";
/// Variables the version manager sets when it activates an environment.
pub const PYENV_ACTIVATION_VARS: [&str; 4] = [
    PYENV_VIRTUAL_ENV,
    "PYENV_VERSION",
    "PYENV_DIR",
    "PYENV_ACTIVATE_SHELL",
];

/// Overrides the environment home directory.
pub const PYSOLATE_HOME: &str = "PYSOLATE_HOME";
/// Overrides the per-script environment root.
pub const PYSOLATE_VENV: &str = "PYSOLATE_VENV";
/// Log level for the launcher.
pub const PYSOLATE_LOG: &str = "PYSOLATE_LOG";
/// Newline-separated requirements installed once, then dropped.
pub const PYSOLATE_DEPS: &str = "PYSOLATE_DEPS";
/// Set on restart to the environment root the next pass must land in.
pub const PYSOLATE_RESTARTED: &str = "PYSOLATE_RESTARTED";

/// Immutable view of the process environment taken at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessContext {
    vars: BTreeMap<String, OsString>,
}

impl ProcessContext {
    /// Capture the variables of the running process.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v))))
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a variable, treating empty values as unset.
    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .get(key)
            .map(OsString::as_os_str)
            .filter(|v| !v.is_empty())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OsStr::to_str)
    }

    /// Path-valued variable.
    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    /// The active-environment marker, if any.
    pub fn marker(&self) -> Option<PathBuf> {
        self.path(VIRTUAL_ENV)
    }

    /// Directories of the `PATH` variable, in order.
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.get(PATH)
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default()
    }

    pub fn pyenv_root(&self) -> Option<PathBuf> {
        self.path(PYENV_ROOT)
    }

    /// Requirements passed through `PYSOLATE_DEPS`, one per line.
    pub fn extra_requirements(&self) -> Vec<String> {
        self.get_str(PYSOLATE_DEPS)
            .map(|deps| {
                deps.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Variables relevant to environment selection, for display.
    pub fn relevant_vars(&self) -> impl Iterator<Item = (&str, &OsStr)> {
        self.vars
            .iter()
            .filter(|(k, _)| {
                k.starts_with("PYENV")
                    || k.starts_with("_OLD_VIRTUAL")
                    || k.starts_with("PYSOLATE_")
                    || k.as_str() == PATH
                    || k.as_str() == VIRTUAL_ENV
            })
            .map(|(k, v)| (k.as_str(), v.as_os_str()))
    }

    /// The context a process would observe after `changes` are applied.
    pub fn with_changes(&self, changes: &EnvChanges) -> Self {
        let mut vars = self.vars.clone();
        for key in &changes.remove {
            vars.remove(key);
        }
        for (key, value) in &changes.set {
            vars.insert(key.clone(), value.clone());
        }
        Self { vars }
    }
}

/// Variable changes to apply when the next process image is launched.
///
/// A key is either set or removed, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvChanges {
    set: BTreeMap<String, OsString>,
    remove: BTreeSet<String>,
}

impl EnvChanges {
    pub fn set(&mut self, key: &str, value: impl Into<OsString>) {
        self.remove.remove(key);
        self.set.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.set.remove(key);
        self.remove.insert(key.to_string());
    }

    /// Fold `later` on top of these changes.
    pub fn extend(&mut self, later: &EnvChanges) {
        for key in &later.remove {
            self.remove(key);
        }
        for (key, value) in &later.set {
            self.set(key, value.clone());
        }
    }

    pub fn get_set(&self, key: &str) -> Option<&OsStr> {
        self.set.get(key).map(OsString::as_os_str)
    }

    pub fn is_removed(&self, key: &str) -> bool {
        self.remove.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    /// Write these changes into the environment of `command`.
    pub fn apply_to(&self, command: &mut Command) {
        for key in &self.remove {
            command.env_remove(key);
        }
        command.envs(&self.set);
    }
}

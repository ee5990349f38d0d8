// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery of installed python interpreters.
//!
//! Candidates come from two sources, cheapest first:
//!
//! 1. the version manager's `<PYENV_ROOT>/versions/*` directories, whose
//!    names already carry the version;
//! 2. `pythonX.Y` executables on `PATH`, each probed with `--version`.
//!
//! Enumeration is lazy, so a request satisfied by the first source never
//! spawns a probe process.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::ProcessContext;
use crate::version::{Version, VersionRequest};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./locator_test.rs"]
mod locator_test;

/// Executable names probed on `PATH`, e.g. `python3.8`.
static VERSIONED_EXECUTABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^python(\d+)\.(\d+)$").expect("valid executable pattern"));

/// Names accepted for the default interpreter, in order.
const DEFAULT_PYTHON_NAMES: [&str; 2] = ["python3", "python"];

/// Where an interpreter was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterSource {
    VersionManager,
    SearchPath,
    /// Accepted without enumeration because no version was requested.
    Default,
}

/// A python interpreter on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub path: PathBuf,
    /// Unknown for interpreters taken on the no-request fast path.
    pub version: Option<Version>,
    pub source: InterpreterSource,
}

/// Finds interpreters in a version-manager root and a search path.
#[derive(Debug, Clone, Default)]
pub struct Locator {
    pyenv_root: Option<PathBuf>,
    search_path: Vec<PathBuf>,
}

impl Locator {
    pub fn new(pyenv_root: Option<PathBuf>, search_path: Vec<PathBuf>) -> Self {
        Self {
            pyenv_root,
            search_path,
        }
    }

    /// Locator for `PYENV_ROOT` and `PATH` of the given context.
    pub fn from_context(ctx: &ProcessContext) -> Self {
        Self::new(ctx.pyenv_root(), ctx.search_path())
    }

    /// The same version-manager root searched with a different `PATH`.
    pub fn with_search_path(&self, search_path: Vec<PathBuf>) -> Self {
        Self {
            pyenv_root: self.pyenv_root.clone(),
            search_path,
        }
    }

    /// Lazily enumerate every interpreter with a known version.
    ///
    /// Version-manager entries come first, newest first; then `PATH`
    /// directories in order, newest first within a directory. Candidates that
    /// cannot be executed or report no version are skipped.
    pub fn find_python_versions(&self) -> impl Iterator<Item = Interpreter> + '_ {
        let mut seen = HashSet::new();
        self.version_manager_candidates()
            .into_iter()
            .chain(
                self.search_path
                    .iter()
                    .flat_map(|dir| versioned_executables(dir))
                    .filter_map(|path| {
                        probe_version(&path).map(|version| Interpreter {
                            path,
                            version: Some(version),
                            source: InterpreterSource::SearchPath,
                        })
                    }),
            )
            .filter(move |interpreter| {
                let key = dunce::canonicalize(&interpreter.path)
                    .unwrap_or_else(|_| interpreter.path.clone());
                seen.insert(key)
            })
    }

    /// Find an interpreter satisfying `request`.
    ///
    /// The first match in [`Self::find_python_versions`] order wins, so any
    /// version-manager match beats `PATH`, and an earlier `PATH` directory
    /// beats a later one even when the later one holds a newer version.
    /// Without a request the default interpreter is accepted immediately.
    pub fn find_python(&self, request: Option<&VersionRequest>) -> Result<Interpreter> {
        let Some(request) = request else {
            return self.default_python();
        };

        tracing::debug!(%request, "Searching for python");
        select_interpreter(self.find_python_versions(), request).ok_or_else(|| {
            Error::NoMatchingInterpreter {
                request: request.to_string(),
            }
        })
    }

    /// The first `python3` (or `python`) on the search path, not probed.
    pub fn default_python(&self) -> Result<Interpreter> {
        DEFAULT_PYTHON_NAMES
            .iter()
            .flat_map(|name| self.search_path.iter().map(move |dir| dir.join(name)))
            .find(|path| is_executable(path))
            .map(|path| Interpreter {
                path,
                version: None,
                source: InterpreterSource::Default,
            })
            .ok_or(Error::InterpreterNotFound)
    }

    fn version_manager_candidates(&self) -> Vec<Interpreter> {
        let Some(root) = &self.pyenv_root else {
            return Vec::new();
        };
        let pattern = format!(
            "{}/versions/*",
            glob::Pattern::escape(&root.to_string_lossy())
        );

        let mut found: Vec<Interpreter> = glob::glob(&pattern)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|dir| {
                let version = Version::parse(dir.file_name()?.to_str()?).ok()?;
                let path = dir.join("bin").join("python");
                is_executable(&path).then_some(Interpreter {
                    path,
                    version: Some(version),
                    source: InterpreterSource::VersionManager,
                })
            })
            .collect();
        found.sort_by(|a, b| b.version.cmp(&a.version));
        found
    }
}

/// First candidate whose version satisfies `request`.
pub fn select_interpreter<I>(candidates: I, request: &VersionRequest) -> Option<Interpreter>
where
    I: IntoIterator<Item = Interpreter>,
{
    candidates.into_iter().find(|candidate| {
        candidate
            .version
            .as_ref()
            .is_some_and(|version| request.matches(version))
    })
}

/// `pythonX.Y` executables in `dir`, newest first. Unreadable directories yield nothing.
fn versioned_executables(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut found: Vec<((u32, u32), PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let caps = VERSIONED_EXECUTABLE.captures(name.to_str()?)?;
            let key = (caps[1].parse().ok()?, caps[2].parse().ok()?);
            let path = entry.path();
            is_executable(&path).then_some((key, path))
        })
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.into_iter().map(|(_, path)| path).collect()
}

/// Run `<path> --version` and parse the reported version.
///
/// Older interpreters print the version on stderr.
fn probe_version(path: &Path) -> Option<Version> {
    let output = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Version::find_in(&String::from_utf8_lossy(&output.stdout))
        .or_else(|| Version::find_in(&String::from_utf8_lossy(&output.stderr)))
}

#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Typed bootstrap configuration.
//!
//! Every setting is resolved with the same precedence: explicit override
//! (command line) > script header > environment variable > default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::context::{PYSOLATE_HOME, PYSOLATE_LOG, PYSOLATE_VENV, ProcessContext};
use crate::spec::{Dependency, ScriptSpec};
use crate::version::VersionRequest;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Directory name used under the per-user data directory.
pub const DEFAULT_HOME_DIRNAME: &str = "pysolate";

/// Launcher log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "RawLevel")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Number(u64),
    Name(String),
}

impl TryFrom<RawLevel> for LogLevel {
    type Error = Error;

    fn try_from(raw: RawLevel) -> Result<Self> {
        match raw {
            RawLevel::Number(n) => Ok(Self::from_number(n)),
            RawLevel::Name(name) => name.parse(),
        }
    }
}

impl LogLevel {
    /// Map the conventional numeric levels (10 debug ... 50 critical).
    pub fn from_number(level: u64) -> Self {
        match level {
            0..=9 => Self::Trace,
            10..=19 => Self::Debug,
            20..=29 => Self::Info,
            30..=39 => Self::Warn,
            _ => Self::Error,
        }
    }

    /// Level from `PYSOLATE_LOG`; unparseable values are ignored.
    pub fn from_context(ctx: &ProcessContext) -> Option<Self> {
        ctx.get_str(PYSOLATE_LOG).and_then(|v| v.parse().ok())
    }

    /// Resolve the effective level before any bootstrap step runs.
    pub fn resolve(flag: Option<Self>, header: Option<Self>, ctx: &ProcessContext) -> Self {
        flag.or(header)
            .or_else(|| Self::from_context(ctx))
            .unwrap_or_default()
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u64>() {
            return Ok(Self::from_number(n));
        }
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "critical" | "fatal" => Ok(Self::Error),
            _ => Err(Error::InvalidLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Explicit overrides, typically from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub python: Option<VersionRequest>,
    pub home: Option<PathBuf>,
    pub venv: Option<PathBuf>,
    pub log_level: Option<LogLevel>,
}

/// Fully resolved configuration for one bootstrap of one script.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Absolute, symlink-resolved script path.
    pub script: PathBuf,

    /// Declared dependencies. Header `dependencies`; default empty.
    pub dependencies: Vec<Dependency>,

    /// Requested interpreter. Header `python`; default none, which accepts
    /// the default interpreter without probing.
    pub python: Option<VersionRequest>,

    /// Home of per-script environments. Header `home`, then `PYSOLATE_HOME`,
    /// default `<data dir>/pysolate`.
    pub home: PathBuf,

    /// Exact environment root. Header `venv`, then `PYSOLATE_VENV`; default
    /// none, meaning `<home>/<identity>`.
    pub venv: Option<PathBuf>,

    /// Header `log_level`, then `PYSOLATE_LOG`; default info.
    pub log_level: LogLevel,
}

impl BootstrapConfig {
    /// Read the script header and resolve the configuration for `script`.
    pub fn load<P: AsRef<Path>>(
        script: P,
        ctx: &ProcessContext,
        overrides: &Overrides,
    ) -> Result<Self> {
        let script = resolve_script(script.as_ref())?;
        let spec = ScriptSpec::load(&script)?;
        Self::resolve(script, spec, ctx, overrides)
    }

    /// Combine an already-loaded header with the process context.
    ///
    /// `script` must already be absolute and resolved.
    pub fn resolve(
        script: PathBuf,
        spec: ScriptSpec,
        ctx: &ProcessContext,
        overrides: &Overrides,
    ) -> Result<Self> {
        let script_dir = script.parent().unwrap_or(Path::new("/")).to_path_buf();
        let cwd = std::env::current_dir()?;

        let home = match (&overrides.home, &spec.home, ctx.path(PYSOLATE_HOME)) {
            (Some(home), _, _) => resolve_path(home, &cwd)?,
            (None, Some(home), _) => resolve_path(home, &script_dir)?,
            (None, None, Some(home)) => resolve_path(&home, &cwd)?,
            (None, None, None) => default_home()?,
        };

        let venv = match (&overrides.venv, &spec.venv, ctx.path(PYSOLATE_VENV)) {
            (Some(venv), _, _) => Some(resolve_path(venv, &cwd)?),
            (None, Some(venv), _) => Some(resolve_path(venv, &script_dir)?),
            (None, None, Some(venv)) => Some(resolve_path(&venv, &cwd)?),
            (None, None, None) => None,
        };

        let log_level = LogLevel::resolve(overrides.log_level, spec.log_level, ctx);

        Ok(Self {
            script,
            dependencies: spec.dependencies,
            python: overrides.python.clone().or(spec.python),
            home,
            venv,
            log_level,
        })
    }

    /// Requirement strings for the installer.
    pub fn requirements(&self) -> Vec<String> {
        self.dependencies.iter().map(Dependency::requirement).collect()
    }
}

/// Absolute, symlink-resolved path of a script.
pub fn resolve_script(script: &Path) -> Result<PathBuf> {
    dunce::canonicalize(script).map_err(|error| Error::ScriptNotFound {
        path: script.to_path_buf(),
        error,
    })
}

/// Per-user default environment home.
pub fn default_home() -> Result<PathBuf> {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .map(|dir| dir.join(DEFAULT_HOME_DIRNAME))
        .ok_or_else(|| {
            Error::ValidationFailed(format!(
                "Cannot determine a data directory; set {PYSOLATE_HOME}"
            ))
        })
}

/// Resolve a configured path (absolute, home-relative, or relative to `base`).
///
/// Existing paths are canonicalized so repeated runs agree on the result.
pub fn resolve_path(path: &Path, base: &Path) -> Result<PathBuf> {
    let path = if let Ok(rest) = path.strip_prefix("~") {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::ValidationFailed("Cannot resolve ~ without HOME".to_string())
        })?;
        home.join(rest)
    } else if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    Ok(dunce::canonicalize(&path).unwrap_or(path))
}

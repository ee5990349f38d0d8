// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Per-script environments: identity, creation, and dependency installation.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use sha1::{Digest, Sha1};

use crate::config::BootstrapConfig;
use crate::lock::CreationLock;
use crate::locator::{Interpreter, InterpreterSource, Locator};
use crate::receipt::Receipt;
use crate::spec::Dependency;
use crate::version::{ReleaseStage, Version, VersionRequest};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// Receipt filename inside an environment root.
pub const RECEIPT_FILENAME: &str = "pysolate.yaml";

/// External isolation tool used for interpreters without a venv module.
pub const VIRTUALENV: &str = "virtualenv";

/// First interpreter release shipping the venv module.
const NATIVE_VENV_SINCE: Version = Version {
    major: 3,
    minor: 3,
    patch: 0,
    stage: ReleaseStage::Final,
    serial: None,
};

/// Deterministic name of a script's environment:
/// `<basename>-<first 6 hex chars of sha1(resolved path)>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvIdentity(String);

impl EnvIdentity {
    /// Identity for a script path, resolving it first.
    pub fn for_script(script: &Path) -> Result<Self> {
        crate::config::resolve_script(script).map(|resolved| Self::from_resolved(&resolved))
    }

    /// Identity for an already absolute, symlink-resolved path.
    pub fn from_resolved(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let digest = format!("{:x}", Sha1::digest(path.to_string_lossy().as_bytes()));
        Self(format!("{name}-{}", &digest[..6]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A script's dedicated environment. Created lazily, never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub identity: EnvIdentity,
    pub root: PathBuf,
    /// Resolved script the environment belongs to.
    pub script: PathBuf,
    pub dependencies: Vec<Dependency>,
}

impl Environment {
    pub fn for_config(config: &BootstrapConfig) -> Self {
        let identity = EnvIdentity::from_resolved(&config.script);
        let root = config
            .venv
            .clone()
            .unwrap_or_else(|| config.home.join(identity.as_str()));
        Self {
            identity,
            root,
            script: config.script.clone(),
            dependencies: config.dependencies.clone(),
        }
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    #[cfg(not(windows))]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    #[cfg(windows)]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("Scripts")
    }

    /// Interpreter inside the environment.
    pub fn python(&self) -> PathBuf {
        self.bin_dir().join(if cfg!(windows) { "python.exe" } else { "python" })
    }

    pub fn receipt_path(&self) -> PathBuf {
        self.root.join(RECEIPT_FILENAME)
    }

    /// Lock file next to the root, shared by concurrent launches.
    pub fn lock_path(&self) -> PathBuf {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.identity.to_string());
        self.root.with_file_name(format!(".{name}.lock"))
    }

    pub fn requirements(&self) -> Vec<String> {
        self.dependencies.iter().map(Dependency::requirement).collect()
    }
}

/// Result of an external provisioning step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionStatus {
    Succeeded,
    /// The tool ran but reported failure.
    Failed { detail: String },
}

impl ProvisionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Creates environments and installs packages into them.
pub trait Provisioner {
    /// Create an isolated environment at `root` from `python`.
    ///
    /// Errors only when no creation tool could be started at all.
    fn create(&self, python: &Interpreter, root: &Path) -> Result<ProvisionStatus>;

    /// Install `requirements` with the environment interpreter `python`.
    fn install(&self, python: &Path, requirements: &[String]) -> ProvisionStatus;
}

/// Provisioner backed by `python -m venv` (or `virtualenv`) and `pip`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VenvProvisioner;

impl Provisioner for VenvProvisioner {
    fn create(&self, python: &Interpreter, root: &Path) -> Result<ProvisionStatus> {
        let creator_error = |error| Error::CreatorNotFound {
            root: root.to_path_buf(),
            python: python.path.clone(),
            error,
        };

        let native = python.version.is_none_or(|v| v >= NATIVE_VENV_SINCE);
        if native {
            let mut cmd = Command::new(&python.path);
            cmd.args(["-m", "venv", "--symlinks"]).arg(root);
            match run_captured(&mut cmd) {
                Ok(status) => return Ok(status),
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    tracing::debug!(python = ?python.path, "Interpreter not startable, trying {VIRTUALENV}");
                }
                Err(error) => return Err(creator_error(error)),
            }
        }

        let mut cmd = Command::new(VIRTUALENV);
        cmd.arg("-p").arg(&python.path).arg(root);
        run_captured(&mut cmd).map_err(creator_error)
    }

    fn install(&self, python: &Path, requirements: &[String]) -> ProvisionStatus {
        let mut cmd = Command::new(python);
        cmd.args(["-m", "pip", "-q", "--disable-pip-version-check", "install"])
            .args(requirements);
        run_captured(&mut cmd).unwrap_or_else(|error| ProvisionStatus::Failed {
            detail: format!("cannot start {}: {error}", python.display()),
        })
    }
}

fn run_captured(cmd: &mut Command) -> std::io::Result<ProvisionStatus> {
    tracing::trace!(?cmd, "Running");
    let output = cmd.stdin(Stdio::null()).output()?;
    if output.status.success() {
        return Ok(ProvisionStatus::Succeeded);
    }
    Ok(ProvisionStatus::Failed {
        detail: format!(
            "{}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
    })
}

/// Options for [`EnvironmentManager::ensure_environment`].
#[derive(Debug, Clone, Default)]
pub struct EnsureOptions {
    /// Interpreter used when the environment has to be created.
    pub python: Option<VersionRequest>,
    /// Install declared dependencies even into an existing environment.
    pub sync: bool,
}

/// What [`EnvironmentManager::ensure_environment`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsureReport {
    pub created: bool,
    /// Outcome of creation, when attempted.
    pub creation: Option<ProvisionStatus>,
    /// Outcome of dependency installation, when attempted.
    pub install: Option<ProvisionStatus>,
}

impl EnsureReport {
    pub fn install_ok(&self) -> bool {
        self.install.as_ref().is_none_or(ProvisionStatus::is_success)
    }
}

/// Creates environments on first use and installs their dependencies once.
#[derive(Debug, Clone)]
pub struct EnvironmentManager<P = VenvProvisioner> {
    locator: Locator,
    provisioner: P,
}

impl<P: Provisioner> EnvironmentManager<P> {
    pub fn new(locator: Locator, provisioner: P) -> Self {
        Self {
            locator,
            provisioner,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Make sure `env` exists, creating it and installing its dependencies
    /// if it does not.
    ///
    /// An existing environment is left untouched unless `options.sync` is
    /// set. Creation and installation failures are logged and reported but
    /// do not abort; installation still runs after a failed creation.
    /// Concurrent calls for the same environment are serialized.
    pub fn ensure_environment(
        &self,
        env: &Environment,
        options: &EnsureOptions,
    ) -> Result<EnsureReport> {
        self.ensure_environment_with(&self.locator, env, options)
    }

    /// Like [`Self::ensure_environment`], but a missing environment is
    /// created from an interpreter found by `locator`.
    pub fn ensure_environment_with(
        &self,
        locator: &Locator,
        env: &Environment,
        options: &EnsureOptions,
    ) -> Result<EnsureReport> {
        if let Some(parent) = env.root.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let _lock = CreationLock::acquire(&env.lock_path())?;

        let mut report = EnsureReport::default();
        let exists = env.exists();
        if exists && !options.sync {
            tracing::debug!(root = ?env.root, "Environment exists");
            return Ok(report);
        }

        let interpreter = if exists {
            self.recorded_interpreter(env)
        } else {
            let interpreter = locator.find_python(options.python.as_ref())?;
            tracing::info!(root = ?env.root, python = ?interpreter.path, "Creating environment");
            let status = self.provisioner.create(&interpreter, &env.root)?;
            if let ProvisionStatus::Failed { detail } = &status {
                tracing::error!(root = ?env.root, "Environment creation failed: {detail}");
            }
            report.created = true;
            report.creation = Some(status);
            interpreter
        };

        let requirements = env.requirements();
        if !requirements.is_empty() {
            report.install = Some(self.install(env, &requirements));
        }

        let receipt = Receipt::generate(&env.script, &interpreter, &requirements, report.install_ok())
            .and_then(|receipt| receipt.save(&env.receipt_path()));
        if let Err(err) = receipt {
            tracing::warn!(root = ?env.root, "Could not write receipt: {err}");
        }

        Ok(report)
    }

    /// Install `requirements` into `env`; failures are logged, not raised.
    pub fn install(&self, env: &Environment, requirements: &[String]) -> ProvisionStatus {
        tracing::debug!(root = ?env.root, "Installing {}", requirements.join(", "));
        let status = self.provisioner.install(&env.python(), requirements);
        if let ProvisionStatus::Failed { detail } = &status {
            tracing::error!(root = ?env.root, "Dependency installation failed: {detail}");
        }
        status
    }

    /// Interpreter an existing environment was built from, if recorded.
    fn recorded_interpreter(&self, env: &Environment) -> Interpreter {
        match Receipt::load(&env.receipt_path()) {
            Ok(Some(receipt)) => Interpreter {
                path: receipt.interpreter.path,
                version: receipt.interpreter.version,
                source: InterpreterSource::Default,
            },
            _ => Interpreter {
                path: env.python(),
                version: None,
                source: InterpreterSource::Default,
            },
        }
    }
}

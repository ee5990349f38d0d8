// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! The restart state machine that moves a script into its environment.
//!
//! Each pass of the launcher classifies the process context against the
//! script's environment root and yields a single [`Step`]: either restart
//! the launcher with the environment activated, or hand the script to the
//! environment's interpreter. The second pass after a restart must land in
//! [`EnvState::RightEnv`]; anything else is reported as a restart loop.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::BootstrapConfig;
use crate::context::{
    EnvChanges, OLD_VIRTUAL_PATH, OLD_VIRTUAL_PYTHONHOME, PATH, PYENV_ACTIVATION_VARS,
    PYENV_VIRTUAL_ENV, PYSOLATE_DEPS, PYSOLATE_RESTARTED, PYTHONHOME, ProcessContext, VIRTUAL_ENV,
};
use crate::environment::{
    EnsureOptions, Environment, EnvironmentManager, Provisioner, VenvProvisioner,
};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./bootstrap_test.rs"]
mod bootstrap_test;

/// How the current process relates to the script's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvState {
    /// No active-environment marker.
    NoEnvVar,
    /// The marker names a different environment.
    WrongEnv { active: PathBuf },
    /// The marker names the script's environment.
    RightEnv,
}

impl EnvState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoEnvVar => "no-env",
            Self::WrongEnv { .. } => "wrong-env",
            Self::RightEnv => "right-env",
        }
    }
}

/// Classify `ctx` against the environment rooted at `root`.
pub fn classify(ctx: &ProcessContext, root: &Path) -> EnvState {
    match ctx.marker() {
        None => EnvState::NoEnvVar,
        Some(active) if same_path(&active, root) => EnvState::RightEnv,
        Some(active) => EnvState::WrongEnv { active },
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    let a = dunce::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let b = dunce::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    a == b
}

/// A process to replace the current one with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Variable changes relative to the current process.
    pub env: EnvChanges,
}

impl Launch {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        self.env.apply_to(&mut cmd);
        cmd
    }

    /// Replace the current process image. Only returns on failure.
    #[cfg(unix)]
    pub fn replace_process(&self) -> Error {
        use std::os::unix::process::CommandExt;

        tracing::debug!(program = ?self.program, args = ?self.args, "exec");
        let error = self.command().exec();
        Error::ExecFailed {
            program: self.program.clone(),
            error,
        }
    }

    /// Run the process to completion and exit with its status.
    #[cfg(not(unix))]
    pub fn replace_process(&self) -> Error {
        tracing::debug!(program = ?self.program, args = ?self.args, "spawn");
        match self.command().status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(1)),
            Err(error) => Error::ExecFailed {
                program: self.program.clone(),
                error,
            },
        }
    }
}

/// The single action a bootstrap pass decides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Re-enter the launcher with the environment activated.
    Restart(Launch),
    /// Hand the script to the environment interpreter.
    Run(Launch),
}

impl Step {
    pub fn launch(&self) -> &Launch {
        match self {
            Self::Restart(launch) | Self::Run(launch) => launch,
        }
    }
}

/// The command line that re-enters the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relaunch {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Relaunch {
    /// The running executable with its original arguments.
    pub fn current() -> Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: std::env::args_os().skip(1).collect(),
        })
    }
}

/// Drives one pass of the restart state machine.
#[derive(Debug, Clone)]
pub struct Bootstrapper<P = VenvProvisioner> {
    manager: EnvironmentManager<P>,
    relaunch: Relaunch,
    sync: bool,
}

impl<P: Provisioner> Bootstrapper<P> {
    pub fn new(manager: EnvironmentManager<P>, relaunch: Relaunch) -> Self {
        Self {
            manager,
            relaunch,
            sync: false,
        }
    }

    /// Install declared dependencies into an existing environment too.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Decide the next step for `config` given the process context.
    ///
    /// Environment creation happens here; the returned step has no side
    /// effects until it is launched.
    pub fn step(
        &self,
        config: &BootstrapConfig,
        ctx: &ProcessContext,
        script_args: &[OsString],
    ) -> Result<Step> {
        let env = Environment::for_config(config);
        let state = classify(ctx, &env.root);
        let restarted = ctx.path(PYSOLATE_RESTARTED);
        tracing::debug!(state = state.name(), root = ?env.root, "Bootstrap pass");

        if let (Some(expected), false) = (&restarted, state == EnvState::RightEnv) {
            return Err(Error::RestartLoop {
                expected: expected.clone(),
                active: ctx.marker(),
            });
        }

        let (leave, locator) = match state {
            EnvState::RightEnv => {
                return self.hand_off(config, ctx, &env, restarted.is_some(), script_args);
            }
            EnvState::NoEnvVar => (EnvChanges::default(), self.manager.locator().clone()),
            EnvState::WrongEnv { active } => {
                tracing::debug!(?active, "Leaving active environment");
                let leave = leave_environment(ctx, &active)?;
                // the new environment must not be built from the one being left
                let search_path = ctx.with_changes(&leave).search_path();
                (leave, self.manager.locator().with_search_path(search_path))
            }
        };

        let options = EnsureOptions {
            python: config.python.clone(),
            sync: self.sync,
        };
        self.manager.ensure_environment_with(&locator, &env, &options)?;

        let mut changes = leave;
        changes.extend(&enter_environment(&ctx.with_changes(&changes), &env)?);
        tracing::debug!(program = ?self.relaunch.program, "Restarting into {}", env.root.display());
        Ok(Step::Restart(Launch {
            program: self.relaunch.program.clone(),
            args: self.relaunch.args.clone(),
            env: changes,
        }))
    }

    fn hand_off(
        &self,
        config: &BootstrapConfig,
        ctx: &ProcessContext,
        env: &Environment,
        restarted: bool,
        script_args: &[OsString],
    ) -> Result<Step> {
        let mut changes = EnvChanges::default();
        if restarted {
            changes.remove(PYSOLATE_RESTARTED);
        } else if self.sync {
            let options = EnsureOptions {
                python: config.python.clone(),
                sync: true,
            };
            self.manager.ensure_environment(env, &options)?;
        }

        if ctx.contains(PYSOLATE_DEPS) {
            let extra = ctx.extra_requirements();
            if !extra.is_empty() {
                self.manager.install(env, &extra);
            }
            changes.remove(PYSOLATE_DEPS);
        }

        let mut args = vec![env.script.clone().into_os_string()];
        args.extend(script_args.iter().cloned());
        tracing::debug!(script = ?env.script, "Starting script");
        Ok(Step::Run(Launch {
            program: env.python(),
            args,
            env: changes,
        }))
    }
}

/// Activate `env`: set the marker, put its `bin` first on `PATH`, and save
/// what activation replaces.
fn enter_environment(ctx: &ProcessContext, env: &Environment) -> Result<EnvChanges> {
    let mut changes = EnvChanges::default();
    changes.set(VIRTUAL_ENV, env.root.as_os_str());

    let bin = env.bin_dir();
    if let Some(path) = ctx.get(PATH) {
        changes.set(OLD_VIRTUAL_PATH, path);
    }
    let mut dirs = vec![bin.clone()];
    dirs.extend(ctx.search_path().into_iter().filter(|dir| dir != &bin));
    changes.set(PATH, join_paths(dirs)?);

    if let Some(home) = ctx.get(PYTHONHOME) {
        changes.set(OLD_VIRTUAL_PYTHONHOME, home);
        changes.remove(PYTHONHOME);
    }

    changes.set(PYSOLATE_RESTARTED, env.root.as_os_str());
    Ok(changes)
}

/// Undo the activation of the environment at `active`.
///
/// Saved activation values are restored when present; otherwise the
/// environment's `bin` is stripped from `PATH`. Environments activated by the
/// version manager also lose its activation variables and plugin directories.
fn leave_environment(ctx: &ProcessContext, active: &Path) -> Result<EnvChanges> {
    let mut changes = EnvChanges::default();
    changes.remove(VIRTUAL_ENV);

    let mut dirs: Vec<PathBuf> = match ctx.get(OLD_VIRTUAL_PATH) {
        Some(saved) => {
            changes.remove(OLD_VIRTUAL_PATH);
            std::env::split_paths(saved).collect()
        }
        None => ctx.search_path(),
    };
    let active_bin = active.join("bin");
    dirs.retain(|dir| dir != &active_bin);

    if let Some(home) = ctx.get(OLD_VIRTUAL_PYTHONHOME) {
        changes.set(PYTHONHOME, home);
        changes.remove(OLD_VIRTUAL_PYTHONHOME);
    }

    if let Some(pyenv_env) = ctx.path(PYENV_VIRTUAL_ENV) {
        for var in PYENV_ACTIVATION_VARS {
            if ctx.contains(var) {
                changes.remove(var);
            }
        }
        let pyenv_bin = pyenv_env.join("bin");
        dirs.retain(|dir| dir != &pyenv_bin);
        if let Some(root) = ctx.pyenv_root() {
            let plugins = root.join("plugins");
            dirs.retain(|dir| !(dir.starts_with(&plugins) && dir.ends_with("bin")));
        }
    }

    changes.set(PATH, join_paths(dirs)?);
    Ok(changes)
}

fn join_paths(dirs: Vec<PathBuf>) -> Result<OsString> {
    std::env::join_paths(dirs)
        .map_err(|err| Error::ValidationFailed(format!("Invalid PATH: {err}")))
}

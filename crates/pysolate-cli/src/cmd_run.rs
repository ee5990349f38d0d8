// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pysolate run` command.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Args;
use miette::Result;
use pysolate::{
    BootstrapConfig, Bootstrapper, EnvironmentManager, Locator, LogLevel, Overrides,
    ProcessContext, Relaunch, ScriptSpec, Step, VenvProvisioner, VersionRequest,
};

/// Run a script inside its environment
#[derive(Debug, Args)]
pub struct CmdRun {
    /// Interpreter version used to create the environment (e.g. 3.8, >=3.10)
    #[clap(short, long)]
    python: Option<VersionRequest>,

    /// Directory holding per-script environments
    #[clap(long)]
    home: Option<PathBuf>,

    /// Exact environment root to use
    #[clap(long)]
    venv: Option<PathBuf>,

    /// Install declared dependencies into an existing environment
    #[clap(long)]
    sync: bool,

    /// Refuse to run unless the script has this SHA256
    #[clap(long, value_name = "HEX")]
    sha256: Option<String>,

    /// Script followed by its arguments
    #[clap(trailing_var_arg = true, required = true, value_name = "SCRIPT")]
    pub(crate) command: Vec<OsString>,
}

impl CmdRun {
    fn script(&self) -> Option<&Path> {
        self.command.first().map(Path::new)
    }

    /// Log level declared in the script header, if readable.
    pub fn header_log_level(&self) -> Option<LogLevel> {
        ScriptSpec::load(self.script()?).ok()?.log_level
    }

    pub fn run(&mut self, ctx: &ProcessContext) -> Result<i32> {
        let Some((script, args)) = self.command.split_first() else {
            return Err(miette::miette!("No script given"));
        };

        if let Some(pinned) = &self.sha256 {
            pysolate::read_verified(Path::new(script), pinned)?;
            tracing::debug!("Script matches pinned SHA256");
        }

        let overrides = Overrides {
            python: self.python.clone(),
            home: self.home.clone(),
            venv: self.venv.clone(),
            log_level: None,
        };
        let config = BootstrapConfig::load(script, ctx, &overrides)?;

        let manager = EnvironmentManager::new(Locator::from_context(ctx), VenvProvisioner);
        let bootstrapper = Bootstrapper::new(manager, Relaunch::current()?).with_sync(self.sync);

        let step = bootstrapper.step(&config, ctx, args)?;
        if let Step::Run(launch) = &step {
            tracing::debug!(python = ?launch.program, "Handing off");
        }
        Err(step.launch().replace_process().into())
    }
}

// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! pysolate - Per-script Python Environment Launcher CLI

use std::ffi::OsString;
use std::path::Path;

use clap::{CommandFactory, Parser, Subcommand};
use miette::Result;
use pysolate::{LogLevel, ProcessContext};

mod cmd_check;
mod cmd_env;
mod cmd_fetch;
mod cmd_init;
mod cmd_run;
mod cmd_show;
mod cmd_versions;

use cmd_check::CmdCheck;
use cmd_env::CmdEnv;
use cmd_fetch::CmdFetch;
use cmd_init::CmdInit;
use cmd_run::CmdRun;
use cmd_show::CmdShow;
use cmd_versions::CmdVersions;


#[derive(Parser)]
#[clap(
    name = "pysolate",
    about = "Per-script Python Environment Launcher",
    version,
    long_about = "Run python scripts inside dedicated environments created on first use.\n\n\
                  Use `#!/usr/bin/env pysolate` as the script's shebang; `pysolate <script>` \
                  is the same as `pysolate run <script>`."
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v debug, -vv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long)]
    quiet: bool,
}

impl Logging {
    /// Level requested on the command line, if any.
    fn level(&self) -> Option<LogLevel> {
        match (self.quiet, self.verbose) {
            (true, _) => Some(LogLevel::Error),
            (false, 0) => None,
            (false, 1) => Some(LogLevel::Debug),
            (false, _) => Some(LogLevel::Trace),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run a script inside its environment
    Run(CmdRun),

    /// Display a script's environment
    Show(CmdShow),

    /// List discovered python interpreters
    Versions(CmdVersions),

    /// Compare an environment with its script's declarations
    Check(CmdCheck),

    /// Download a file verified against a pinned SHA256
    Fetch(CmdFetch),

    /// Create a new script with a pysolate header
    Init(CmdInit),

    /// Print the variables that drive environment selection
    Env(CmdEnv),
}

impl Opt {
    fn run(self) -> Result<i32> {
        let ctx = ProcessContext::from_env();
        let header = match &self.cmd {
            Command::Run(cmd) => cmd.header_log_level(),
            _ => None,
        };
        let level = LogLevel::resolve(self.logging.level(), header, &ctx);

        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::from(level))
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Run(mut cmd) => cmd.run(&ctx),
            Command::Show(mut cmd) => cmd.run(&ctx),
            Command::Versions(mut cmd) => cmd.run(&ctx),
            Command::Check(mut cmd) => cmd.run(&ctx),
            Command::Fetch(mut cmd) => cmd.run(),
            Command::Init(mut cmd) => cmd.run(),
            Command::Env(mut cmd) => cmd.run(&ctx),
        }
    }
}

/// Insert `run` when invoked as `pysolate <script> [args...]`, which is how
/// a `#!/usr/bin/env pysolate` shebang calls us.
fn shebang_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();
    let is_script = args.get(1).is_some_and(|first| {
        let text = first.to_string_lossy();
        !text.starts_with('-')
            && Opt::command().find_subcommand(text.as_ref()).is_none()
            && Path::new(first).is_file()
    });
    if is_script {
        args.insert(1, OsString::from("run"));
    }
    args
}

fn main() -> Result<()> {
    let opt = Opt::parse_from(shebang_args(std::env::args_os()));
    let code = opt.run()?;
    std::process::exit(code);
}

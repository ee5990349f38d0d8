// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pysolate versions` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use pysolate::{InterpreterSource, Locator, ProcessContext, VersionRequest};

/// List discovered python interpreters
#[derive(Debug, Args)]
pub struct CmdVersions {
    /// Only list interpreters matching this request (e.g. 3.8, <=3.6)
    #[clap(short, long)]
    python: Option<VersionRequest>,
}

impl CmdVersions {
    pub fn run(&mut self, ctx: &ProcessContext) -> Result<i32> {
        let locator = Locator::from_context(ctx);
        let mut found = 0;

        for interpreter in locator.find_python_versions() {
            let Some(version) = interpreter.version else {
                continue;
            };
            if self.python.as_ref().is_some_and(|r| !r.matches(&version)) {
                continue;
            }

            found += 1;
            let source = match interpreter.source {
                InterpreterSource::VersionManager => "pyenv",
                InterpreterSource::SearchPath => "PATH",
                InterpreterSource::Default => "default",
            };
            println!(
                "{:<10} {:<6} {}",
                version.to_string().green(),
                source.dimmed(),
                interpreter.path.display()
            );
        }

        if found == 0 {
            match &self.python {
                Some(request) => eprintln!("No python matching {request}"),
                None => eprintln!("No python interpreters found"),
            }
            return Ok(1);
        }
        Ok(0)
    }
}

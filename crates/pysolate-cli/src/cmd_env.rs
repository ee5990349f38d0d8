// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pysolate env` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use pysolate::ProcessContext;

/// Print the variables that drive environment selection
#[derive(Debug, Args)]
pub struct CmdEnv {}

impl CmdEnv {
    pub fn run(&mut self, ctx: &ProcessContext) -> Result<i32> {
        for (key, value) in ctx.relevant_vars() {
            println!("{} {}", key.cyan(), value.to_string_lossy());
        }
        Ok(0)
    }
}

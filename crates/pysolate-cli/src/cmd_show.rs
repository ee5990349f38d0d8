// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pysolate show` command.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use pysolate::{BootstrapConfig, Environment, Overrides, ProcessContext, Receipt};
use serde::Serialize;

/// Display a script's environment
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Script to inspect
    script: PathBuf,

    /// Output format: table, yaml
    #[clap(long, default_value = "table")]
    format: String,
}

#[derive(Debug, Serialize)]
struct ShowReport {
    script: PathBuf,
    identity: String,
    root: PathBuf,
    python: PathBuf,
    exists: bool,
    state: &'static str,
    requested_python: Option<String>,
    dependencies: Vec<String>,
    receipt: Option<ReceiptSummary>,
}

#[derive(Debug, Serialize)]
struct ReceiptSummary {
    created: String,
    interpreter: PathBuf,
    version: Option<String>,
    install_ok: bool,
}

impl CmdShow {
    pub fn run(&mut self, ctx: &ProcessContext) -> Result<i32> {
        let config = BootstrapConfig::load(&self.script, ctx, &Overrides::default())?;
        let env = Environment::for_config(&config);
        let receipt = Receipt::load(&env.receipt_path())?;

        let report = ShowReport {
            script: env.script.clone(),
            identity: env.identity.to_string(),
            root: env.root.clone(),
            python: env.python(),
            exists: env.exists(),
            state: pysolate::classify(ctx, &env.root).name(),
            requested_python: config.python.as_ref().map(ToString::to_string),
            dependencies: env.requirements(),
            receipt: receipt.map(|r| ReceiptSummary {
                created: r.generated.timestamp.to_rfc3339(),
                interpreter: r.interpreter.path,
                version: r.interpreter.version.map(|v| v.to_string()),
                install_ok: r.install_ok,
            }),
        };

        if self.format == "yaml" {
            print!("{}", serde_yaml::to_string(&report).into_diagnostic()?);
        } else {
            self.show_table(&report);
        }

        Ok(0)
    }

    fn show_table(&self, report: &ShowReport) {
        println!("{}", "Environment:".bold());
        println!();
        println!("  script:    {}", report.script.display().to_string().cyan());
        println!("  identity:  {}", report.identity.green());
        println!("  root:      {}", report.root.display());
        println!("  python:    {}", report.python.display());
        let exists = if report.exists {
            "yes".green()
        } else {
            "no (created on first run)".yellow()
        };
        println!("  exists:    {exists}");
        println!("  state:     {}", report.state);
        if let Some(request) = &report.requested_python {
            println!("  requested: python {request}");
        }

        println!();
        println!("{}", "Dependencies:".bold());
        println!();
        if report.dependencies.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for (i, dep) in report.dependencies.iter().enumerate() {
            println!("  {}. {}", i + 1, dep.green());
        }

        if let Some(receipt) = &report.receipt {
            println!();
            println!("{}", "Receipt:".bold());
            println!();
            println!("  created:     {}", receipt.created);
            let version = receipt.version.as_deref().unwrap_or("unknown");
            println!(
                "  interpreter: {} ({version})",
                receipt.interpreter.display()
            );
            if !receipt.install_ok {
                println!("  {}", "last dependency install failed".red());
            }
        }
    }
}

// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Compare an environment's receipt with its script's current declarations.

use std::path::PathBuf;

use clap::Args;
use miette::Result;
use pysolate::{
    BootstrapConfig, Environment, Overrides, ProcessContext, Receipt, ReceiptChangeKind,
};

/// Compare an environment with its script's declarations
#[derive(Debug, Args)]
pub struct CmdCheck {
    /// Script whose environment to check
    script: PathBuf,

    /// Exit with error on drift
    #[clap(long)]
    strict: bool,
}

impl CmdCheck {
    pub fn run(&mut self, ctx: &ProcessContext) -> Result<i32> {
        let config = BootstrapConfig::load(&self.script, ctx, &Overrides::default())?;
        let env = Environment::for_config(&config);
        let receipt_path = env.receipt_path();

        let Some(receipt) = Receipt::load(&receipt_path)? else {
            if self.strict {
                return Err(miette::miette!("No receipt found at {:?}", receipt_path));
            }
            println!("Warning: No receipt found (environment not created yet?)");
            return Ok(2);
        };

        let changes = pysolate::verify_receipt(&receipt, &config)?;
        let drift = changes.iter().any(|c| c.kind.is_drift());

        if changes.is_empty() {
            println!("✓ Environment matches declarations");
            return Ok(0);
        }

        if drift && self.strict {
            eprintln!("Error: Environment differs from declarations:");
        } else if drift {
            println!("Warning: Environment differs from declarations:");
        }

        for change in &changes {
            match &change.kind {
                ReceiptChangeKind::DependencyAdded => {
                    println!("  + Dependency '{}' is not installed", change.reference);
                }
                ReceiptChangeKind::DependencyRemoved => {
                    println!("  - Dependency '{}' is no longer declared", change.reference);
                }
                ReceiptChangeKind::InterpreterMismatch => {
                    println!("  - Interpreter '{}' no longer matches", change.reference);
                    if let (Some(exp), Some(act)) = (&change.expected, &change.actual) {
                        println!("    Requested: {}", exp);
                        println!("    Actual:    {}", act);
                    }
                }
                ReceiptChangeKind::ScriptChanged => {
                    println!("  Note: script '{}' was modified", change.reference);
                }
            }
        }

        if !drift {
            return Ok(0);
        }
        if self.strict {
            return Ok(1);
        }

        println!(
            "\nRun 'pysolate run --sync {}' to install the declared dependencies",
            self.script.display()
        );
        Ok(0)
    }
}

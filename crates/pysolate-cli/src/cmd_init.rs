// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pysolate init` command.

use clap::Args;
use miette::{IntoDiagnostic, Result};
use pysolate::VersionRequest;
use std::path::PathBuf;

/// Create a new script with a pysolate header
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Script to create
    path: PathBuf,

    /// Requested python version (e.g. 3.8, >=3.10)
    #[clap(short, long)]
    python: Option<VersionRequest>,

    /// Add a dependency (repeatable)
    #[clap(long = "dep")]
    deps: Vec<String>,
}

impl CmdInit {
    pub fn run(&mut self) -> Result<i32> {
        if self.path.exists() {
            return Err(miette::miette!("{:?} already exists", self.path));
        }

        std::fs::write(&self.path, self.generate_template())
            .map_err(|e| miette::miette!("Failed to write {:?}: {}", self.path, e))?;
        make_executable(&self.path)?;

        println!("Created {:?}", self.path);
        println!();
        println!("Next steps:");
        println!("  1. Edit the header to declare dependencies");
        println!("  2. Run 'pysolate show {}' to preview the environment", self.path.display());
        println!("  3. Run it directly: {}", self.path.display());

        Ok(0)
    }

    pub(crate) fn generate_template(&self) -> String {
        let python = match &self.python {
            Some(request) => format!("# python: \"{request}\"\n"),
            None => "# python: \"3\"\n".to_string(),
        };
        let dependencies = if self.deps.is_empty() {
            "# dependencies: []\n".to_string()
        } else {
            format!(
                "# dependencies:\n{}\n",
                self.deps
                    .iter()
                    .map(|d| format!("#   - \"{}\"", d.replace('"', "\\\"")))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };

        format!(
            "#!/usr/bin/env pysolate\n\
            # /// pysolate\n\
            {python}\
            {dependencies}\
            # ///\n\
            \n\
            \n\
            def main():\n    \
                print(\"hello from pysolate\")\n\
            \n\
            \n\
            if __name__ == \"__main__\":\n    \
                main()\n"
        )
    }
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).into_diagnostic()
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

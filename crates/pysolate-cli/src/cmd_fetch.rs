// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `pysolate fetch` command.

use std::path::PathBuf;

use clap::Args;
use miette::Result;

/// Download a file verified against a pinned SHA256
#[derive(Debug, Args)]
pub struct CmdFetch {
    /// URL to fetch
    url: String,

    /// Expected SHA256 of the content
    #[clap(long, value_name = "HEX")]
    sha256: String,

    /// Destination (default: last URL segment in the current directory)
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl CmdFetch {
    pub fn run(&mut self) -> Result<i32> {
        let dest = match &self.output {
            Some(output) => output.clone(),
            None => default_destination(&self.url).ok_or_else(|| {
                miette::miette!("Cannot derive a file name from {}; use --output", self.url)
            })?,
        };

        let content = pysolate::fetch_pinned(&self.url, &self.sha256, &dest)?;
        println!("✓ {} ({} bytes, sha256 verified)", dest.display(), content.len());
        Ok(0)
    }
}

/// Last non-empty path segment of `url`, without query or fragment.
pub(crate) fn default_destination(url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next()?;
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let (_, path) = path.split_once('/')?;
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(PathBuf::from)
}

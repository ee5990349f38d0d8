// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Parsing of the `# /// pysolate` header declared at the top of a script.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::LogLevel;
use crate::version::VersionRequest;

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// Line opening the header block.
pub const HEADER_OPEN: &str = "# /// pysolate";

/// Line closing the header block.
pub const HEADER_CLOSE: &str = "# ///";

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    /// Literal requirement string, passed to the installer verbatim.
    Requirement(String),
    /// `[name, constraint]` pair.
    Pinned(String, String),
}

impl Dependency {
    /// The requirement string handed to the installer.
    pub fn requirement(&self) -> String {
        match self {
            Self::Requirement(req) => req.clone(),
            Self::Pinned(name, constraint) => format!("{name}{constraint}"),
        }
    }
}

/// Configuration declared by a script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptSpec {
    /// Requested interpreter version (prefix or comparison).
    #[serde(default)]
    pub python: Option<VersionRequest>,

    /// Dependencies installed when the environment is created.
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Directory holding per-script environments.
    #[serde(default)]
    pub home: Option<PathBuf>,

    /// Exact environment root, bypassing the identity-derived one.
    #[serde(default)]
    pub venv: Option<PathBuf>,

    #[serde(default)]
    pub log_level: Option<LogLevel>,

    /// Path to the script this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl ScriptSpec {
    /// Parse the header out of a script's source text.
    ///
    /// A script without a header yields the default (empty) spec.
    pub fn from_source(source: &str) -> crate::Result<Self> {
        let Some(header) = extract_header(source)? else {
            return Ok(Self::default());
        };
        if header.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&header).map_err(|error| crate::Error::InvalidHeader { error, header })
    }

    /// Load the header of a script file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|error| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error,
        })?;

        let mut spec = Self::from_source(&String::from_utf8_lossy(&bytes))?;
        spec.source_path = Some(path.to_path_buf());
        Ok(spec)
    }

    /// Requirement strings for the installer, in declaration order.
    pub fn requirements(&self) -> Vec<String> {
        self.dependencies.iter().map(Dependency::requirement).collect()
    }
}

/// Collect the YAML between the header delimiters, with comment markers stripped.
fn extract_header(source: &str) -> crate::Result<Option<String>> {
    let mut lines = source.lines().enumerate();
    let Some((start, _)) = lines
        .by_ref()
        .find(|(_, line)| line.trim_end() == HEADER_OPEN)
    else {
        return Ok(None);
    };

    let mut header = String::new();
    for (_, line) in lines {
        if line.trim_end() == HEADER_CLOSE {
            return Ok(Some(header));
        }
        let Some(content) = line.strip_prefix('#') else {
            break;
        };
        header.push_str(content.strip_prefix(' ').unwrap_or(content));
        header.push('\n');
    }

    Err(crate::Error::UnterminatedHeader { line: start + 1 })
}

// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Interpreter versions and version requests.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./version_test.rs"]
mod version_test;

const VERSION_PATTERN: &str = r"(\d+)\.(\d+)(?:\.(\d+))?(?:(a|b|rc|c)(\d+)?)?";

/// Matches a whole version string, such as a version-manager directory name.
static EXACT_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{VERSION_PATTERN}$")).expect("valid version pattern"));

/// Finds the first version inside free text, such as `--version` output.
static EMBEDDED_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(VERSION_PATTERN).expect("valid version pattern"));

/// Release stage of an interpreter build, ordered from least to most stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReleaseStage {
    Alpha,
    Beta,
    Candidate,
    #[default]
    Final,
}

impl ReleaseStage {
    /// Suffix used when formatting a version in this stage.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Candidate => "rc",
            Self::Final => "",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "a" => Some(Self::Alpha),
            "b" => Some(Self::Beta),
            "rc" | "c" => Some(Self::Candidate),
            _ => None,
        }
    }
}

/// An interpreter version.
///
/// Ordering follows the field order, so two versions compare like the tuple
/// `(major, minor, patch, stage, serial)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub stage: ReleaseStage,
    pub serial: Option<u32>,
}

impl Version {
    /// A final release version.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            stage: ReleaseStage::Final,
            serial: None,
        }
    }

    /// Replace the release stage and serial of this version.
    pub fn with_release(mut self, stage: ReleaseStage, serial: Option<u32>) -> Self {
        self.stage = stage;
        self.serial = serial;
        self
    }

    /// Parse a complete version string such as `3.8.2` or `3.13.0rc1`.
    pub fn parse(value: &str) -> Result<Self> {
        EXACT_VERSION
            .captures(value.trim())
            .and_then(|caps| from_captures(&caps))
            .ok_or_else(|| Error::InvalidVersion(value.to_string()))
    }

    /// Find the first version embedded in free text (e.g. `Python 3.8.2`).
    pub fn find_in(text: &str) -> Option<Self> {
        EMBEDDED_VERSION
            .captures(text)
            .and_then(|caps| from_captures(&caps))
    }

    /// The numeric `(major, minor, patch)` components.
    pub fn components(&self) -> [u32; 3] {
        [self.major, self.minor, self.patch]
    }
}

fn from_captures(caps: &regex::Captures<'_>) -> Option<Version> {
    let number = |idx: usize| -> Option<u32> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let stage = match caps.get(4) {
        Some(m) => ReleaseStage::from_suffix(m.as_str())?,
        None => ReleaseStage::Final,
    };
    let serial = match caps.get(5) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    Some(Version {
        major: number(1)?,
        minor: number(2)?,
        patch: number(3)?,
        stage,
        serial,
    })
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}{}",
            self.major,
            self.minor,
            self.patch,
            self.stage.suffix()
        )?;
        if let Some(serial) = self.serial {
            write!(f, "{serial}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// Comparison operator of a [`VersionRequest::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    // longest symbols first so "<=" is not read as "<"
    const SYMBOLS: [(&'static str, CompareOp); 6] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether `ordering` (candidate compared to requested) satisfies this operator.
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// Caller-supplied version predicate.
#[derive(Clone)]
pub struct Predicate {
    label: String,
    test: Arc<dyn Fn(&Version) -> bool + Send + Sync>,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.label).finish()
    }
}

/// A requested interpreter version.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub enum VersionRequest {
    /// Leading components must be equal (`"3.8"` accepts any 3.8.x).
    Prefix(Vec<u32>),
    /// Leading components compared with an operator (`"<=3.6"`).
    Compare(CompareOp, Vec<u32>),
    /// Arbitrary test against the full candidate version.
    Predicate(Predicate),
}

impl VersionRequest {
    /// Build a request from a caller-supplied predicate.
    pub fn predicate<F>(label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Version) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Predicate {
            label: label.into(),
            test: Arc::new(test),
        })
    }

    /// Build a comparison request, e.g. `compare(CompareOp::Le, "3.6")`.
    pub fn compare(op: CompareOp, version: &str) -> Result<Self> {
        Ok(Self::Compare(op, parse_components(version)?))
    }

    /// Whether `version` satisfies this request.
    pub fn matches(&self, version: &Version) -> bool {
        let components = version.components();
        match self {
            Self::Prefix(parts) => components
                .get(..parts.len())
                .is_some_and(|head| head == &parts[..]),
            Self::Compare(op, parts) => components
                .get(..parts.len())
                .is_some_and(|head| op.accepts(head.cmp(&parts[..]))),
            Self::Predicate(predicate) => (predicate.test)(version),
        }
    }
}

fn parse_components(value: &str) -> Result<Vec<u32>> {
    let invalid = || Error::InvalidRequest(value.to_string());
    let parts = value
        .trim()
        .split('.')
        .map(|part| part.parse::<u32>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>>>()?;
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }
    Ok(parts)
}

fn join_components(parts: &[u32]) -> String {
    parts
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(parts) => f.write_str(&join_components(parts)),
            Self::Compare(op, parts) => write!(f, "{}{}", op.symbol(), join_components(parts)),
            Self::Predicate(predicate) => f.write_str(&predicate.label),
        }
    }
}

impl FromStr for VersionRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        for (symbol, op) in CompareOp::SYMBOLS {
            if let Some(rest) = s.strip_prefix(symbol) {
                return parse_components(rest)
                    .map(|parts| Self::Compare(op, parts))
                    .map_err(|_| Error::InvalidRequest(s.to_string()));
            }
        }
        parse_components(s).map(Self::Prefix)
    }
}

impl TryFrom<String> for VersionRequest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

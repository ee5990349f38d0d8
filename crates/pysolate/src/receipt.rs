// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Receipts recording what an environment was built with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::BootstrapConfig;
use crate::locator::Interpreter;
use crate::trust::sha256_hex;
use crate::version::Version;

#[cfg(test)]
#[path = "./receipt_test.rs"]
mod receipt_test;

/// Receipt API version.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum ReceiptApiVersion {
    #[serde(rename = "pysolate/v0/receipt")]
    V0,
}

/// Receipt written into the environment root after creation or sync.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Receipt {
    pub api: ReceiptApiVersion,
    pub generated: GenerationMetadata,
    pub script: ScriptRecord,
    pub interpreter: InterpreterRecord,
    pub dependencies: Vec<String>,
    pub install_ok: bool,
}

/// Metadata about when and where the receipt was written.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GenerationMetadata {
    pub timestamp: DateTime<Utc>,
    pub pysolate_version: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ScriptRecord {
    pub path: PathBuf,
    pub sha256: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InterpreterRecord {
    pub path: PathBuf,
    pub version: Option<Version>,
}

impl Receipt {
    /// Build a receipt for `script` built with `interpreter`.
    pub fn generate(
        script: &Path,
        interpreter: &Interpreter,
        dependencies: &[String],
        install_ok: bool,
    ) -> crate::Result<Self> {
        let content = std::fs::read(script).map_err(|error| crate::Error::ReadFailed {
            path: script.to_path_buf(),
            error,
        })?;

        Ok(Self {
            api: ReceiptApiVersion::V0,
            generated: GenerationMetadata {
                timestamp: Utc::now(),
                pysolate_version: env!("CARGO_PKG_VERSION").to_string(),
                hostname: hostname::get()
                    .ok()
                    .and_then(|h| h.into_string().ok())
                    .unwrap_or_else(|| "unknown".to_string()),
            },
            script: ScriptRecord {
                path: script.to_path_buf(),
                sha256: sha256_hex(&content),
            },
            interpreter: InterpreterRecord {
                path: interpreter.path.clone(),
                version: interpreter.version,
            },
            dependencies: dependencies.to_vec(),
            install_ok,
        })
    }

    /// Load a receipt, returning `None` when the file does not exist.
    pub fn load(path: &Path) -> crate::Result<Option<Self>> {
        let yaml = match std::fs::read_to_string(path) {
            Ok(yaml) => yaml,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(crate::Error::ReadFailed {
                    path: path.to_path_buf(),
                    error,
                });
            }
        };
        serde_yaml::from_str(&yaml)
            .map(Some)
            .map_err(|error| crate::Error::InvalidReceipt {
                path: path.to_path_buf(),
                error,
            })
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(|error| crate::Error::InvalidReceipt {
            path: path.to_path_buf(),
            error,
        })?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

/// Report how the current declarations drifted from a receipt.
///
/// Existing environments are never updated automatically, so this is the
/// only place drift becomes visible.
pub fn verify_receipt(
    receipt: &Receipt,
    config: &BootstrapConfig,
) -> crate::Result<Vec<ReceiptChange>> {
    let mut changes = Vec::new();

    let declared = config.requirements();
    for requirement in &declared {
        if !receipt.dependencies.contains(requirement) {
            changes.push(ReceiptChange {
                kind: ReceiptChangeKind::DependencyAdded,
                reference: requirement.clone(),
                expected: None,
                actual: Some(requirement.clone()),
            });
        }
    }
    for recorded in &receipt.dependencies {
        if !declared.contains(recorded) {
            changes.push(ReceiptChange {
                kind: ReceiptChangeKind::DependencyRemoved,
                reference: recorded.clone(),
                expected: Some(recorded.clone()),
                actual: None,
            });
        }
    }

    if let (Some(request), Some(version)) = (&config.python, &receipt.interpreter.version) {
        if !request.matches(version) {
            changes.push(ReceiptChange {
                kind: ReceiptChangeKind::InterpreterMismatch,
                reference: receipt.interpreter.path.display().to_string(),
                expected: Some(request.to_string()),
                actual: Some(version.to_string()),
            });
        }
    }

    let content = std::fs::read(&config.script)?;
    let actual_hash = sha256_hex(&content);
    if actual_hash != receipt.script.sha256 {
        changes.push(ReceiptChange {
            kind: ReceiptChangeKind::ScriptChanged,
            reference: config.script.display().to_string(),
            expected: Some(receipt.script.sha256.clone()),
            actual: Some(actual_hash),
        });
    }

    Ok(changes)
}

/// A single detected difference between a receipt and the declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptChange {
    pub kind: ReceiptChangeKind,
    pub reference: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Types of receipt drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptChangeKind {
    DependencyAdded,
    DependencyRemoved,
    InterpreterMismatch,
    /// Informational: the script body changed since the environment was built.
    ScriptChanged,
}

impl ReceiptChangeKind {
    /// Whether this change means the environment is missing declared state.
    pub fn is_drift(&self) -> bool {
        !matches!(self, Self::ScriptChanged)
    }
}

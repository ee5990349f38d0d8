// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! pysolate - Per-script Python Environment Bootstrap
//!
//! This crate provides the core library for running a python script inside
//! its own isolated environment, created on first use and reused afterwards.
//!
//! # Overview
//!
//! Every script gets a dedicated environment named after its resolved path.
//! The launcher locates a suitable interpreter, creates the environment,
//! installs the declared dependencies once, and then restarts itself with the
//! environment activated. The second pass finds itself inside the right
//! environment and hands the script over to the environment's interpreter.
//!
//! # Example
//!
//! ```python
//! #!/usr/bin/env pysolate
//! # /// pysolate
//! # python: "3.8"
//! # dependencies:
//! #   - click >=7.0
//! #   - [requests, ">=2.0"]
//! # ///
//! import click, requests
//! ```

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod locator;
pub mod lock;
pub mod receipt;
pub mod spec;
pub mod trust;
pub mod version;

pub use bootstrap::{classify, Bootstrapper, EnvState, Launch, Relaunch, Step};
pub use config::{BootstrapConfig, LogLevel, Overrides};
pub use context::{EnvChanges, ProcessContext};
pub use environment::{
    EnsureOptions, EnsureReport, EnvIdentity, Environment, EnvironmentManager, ProvisionStatus,
    Provisioner, VenvProvisioner,
};
pub use error::{Error, Result};
pub use locator::{Interpreter, InterpreterSource, Locator};
pub use receipt::{verify_receipt, Receipt, ReceiptChange, ReceiptChangeKind};
pub use spec::{Dependency, ScriptSpec};
pub use trust::{fetch_pinned, read_verified, sha256_hex, verify_sha256};
pub use version::{CompareOp, ReleaseStage, Version, VersionRequest};

// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for pysolate operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with pysolate Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while bootstrapping a script.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// The script to bootstrap does not exist
    #[error("Script not found: {path:?}")]
    #[diagnostic(code(pysolate::script_not_found))]
    ScriptNotFound {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(pysolate::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Invalid YAML inside the script header
    #[error("Invalid pysolate header: {error}")]
    #[diagnostic(
        code(pysolate::invalid_header),
        help("The lines between '# /// pysolate' and '# ///' must form a YAML mapping")
    )]
    InvalidHeader {
        #[source]
        error: serde_yaml::Error,
        header: String,
    },

    /// Header block opened but never closed
    #[error("Unterminated pysolate header starting at line {line}")]
    #[diagnostic(
        code(pysolate::unterminated_header),
        help("Close the block with a '# ///' line; every line inside must start with '#'")
    )]
    UnterminatedHeader { line: usize },

    /// Unparseable interpreter version
    #[error("Invalid python version: {0:?}")]
    #[diagnostic(code(pysolate::invalid_version))]
    InvalidVersion(String),

    /// Unparseable interpreter request
    #[error("Invalid python request: {0:?}")]
    #[diagnostic(
        code(pysolate::invalid_request),
        help("Use a dotted prefix such as \"3.8\" or a comparison such as \">=3.6\"")
    )]
    InvalidRequest(String),

    /// Unrecognized log level
    #[error("Invalid log level: {0:?}")]
    #[diagnostic(
        code(pysolate::invalid_log_level),
        help("Use trace, debug, info, warning, error, critical or 10/20/30/40/50")
    )]
    InvalidLogLevel(String),

    /// No interpreter satisfies the requested version
    #[error("Could not find a suitable python version for {request}")]
    #[diagnostic(
        code(pysolate::no_matching_interpreter),
        help("Install a matching interpreter as pythonX.Y on PATH, or under $PYENV_ROOT/versions")
    )]
    NoMatchingInterpreter { request: String },

    /// No default interpreter on PATH
    #[error("No python interpreter found on PATH")]
    #[diagnostic(
        code(pysolate::interpreter_not_found),
        help("Install python3 or declare a version with `python:` in the script header")
    )]
    InterpreterNotFound,

    /// Neither the native venv module nor virtualenv could be started
    #[error("Cannot create environment at {root:?}: no environment creator could be started")]
    #[diagnostic(
        code(pysolate::creator_not_found),
        help("Make sure {python:?} ships the venv module, or install virtualenv")
    )]
    CreatorNotFound {
        root: PathBuf,
        python: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Process replacement failed
    #[error("Failed to execute {program:?}")]
    #[diagnostic(code(pysolate::exec_failed))]
    ExecFailed {
        program: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The bootstrap was re-entered but still not inside the target environment
    #[error("Restarted into {expected:?} but the active environment is {active:?}")]
    #[diagnostic(
        code(pysolate::restart_loop),
        help("Something rewrote VIRTUAL_ENV between restarts; refusing to restart again")
    )]
    RestartLoop {
        expected: PathBuf,
        active: Option<PathBuf>,
    },

    /// Content digest did not match the pinned hash
    #[error("SHA256 mismatch for {subject}")]
    #[diagnostic(
        code(pysolate::integrity_mismatch),
        help("expected {expected}, got {actual}")
    )]
    IntegrityMismatch {
        subject: String,
        expected: String,
        actual: String,
    },

    /// HTTP fetch failed
    #[error("Failed to fetch {url}: {message}")]
    #[diagnostic(code(pysolate::fetch_failed))]
    Fetch { url: String, message: String },

    /// Receipt file could not be parsed
    #[error("Invalid receipt file: {path:?}")]
    #[diagnostic(
        code(pysolate::invalid_receipt),
        help("Remove the environment directory to have it recreated")
    )]
    InvalidReceipt {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(pysolate::validation_failed))]
    ValidationFailed(String),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(pysolate::io_error))]
    Io(#[from] std::io::Error),
}

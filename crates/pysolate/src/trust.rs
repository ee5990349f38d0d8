// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Pinned-hash verification for code fetched or run from outside.
//!
//! Every check fails closed: content is only returned or written after its
//! SHA-256 digest matched the pinned value.

use std::io::{Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{Error, Result};

#[cfg(test)]
#[path = "./trust_test.rs"]
mod trust_test;

/// Lowercase hex SHA-256 digest of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Check `content` against a pinned hex digest (case-insensitive).
pub fn verify_sha256(subject: &str, content: &[u8], pinned: &str) -> Result<()> {
    let actual = sha256_hex(content);
    let expected = pinned.trim().to_ascii_lowercase();
    if actual != expected {
        return Err(Error::IntegrityMismatch {
            subject: subject.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Verify a file on disk against a pinned digest and return its content.
pub fn read_verified(path: &Path, pinned: &str) -> Result<Vec<u8>> {
    let content = std::fs::read(path).map_err(|error| Error::ReadFailed {
        path: path.to_path_buf(),
        error,
    })?;
    verify_sha256(&path.display().to_string(), &content, pinned)?;
    Ok(content)
}

/// Return the verified content of `dest`, fetching it from `url` once.
///
/// An existing `dest` is never re-fetched; if it fails verification the
/// call errors. Fetched content is verified before anything is written.
pub fn fetch_pinned(url: &str, pinned: &str, dest: &Path) -> Result<Vec<u8>> {
    if dest.exists() {
        tracing::debug!(path = ?dest, "Using cached copy");
        return read_verified(dest, pinned);
    }

    tracing::info!(%url, "Fetching");
    let content = http_get(url)?;
    verify_sha256(url, &content, pinned)?;

    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&content)?;
    tmp.persist(dest).map_err(|err| err.error)?;

    Ok(content)
}

fn http_get(url: &str) -> Result<Vec<u8>> {
    let fetch_error = |message: String| Error::Fetch {
        url: url.to_string(),
        message,
    };

    let response = ureq::get(url).call().map_err(|e| fetch_error(e.to_string()))?;
    let mut content = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut content)
        .map_err(|e| fetch_error(e.to_string()))?;
    Ok(content)
}

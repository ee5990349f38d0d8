// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

//! Advisory lock serializing environment creation for one identity.

use std::fs::File;
use std::path::Path;

#[cfg(test)]
#[path = "./lock_test.rs"]
mod lock_test;

/// Exclusive lock held for the lifetime of the value.
#[derive(Debug)]
pub struct CreationLock {
    #[cfg(unix)]
    _flock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl CreationLock {
    /// Block until the lock file at `path` is exclusively locked.
    pub fn acquire(path: &Path) -> crate::Result<Self> {
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        #[cfg(unix)]
        {
            tracing::trace!(lock = ?path, "Waiting for environment lock");
            let flock = nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive)
                .map_err(|(_, errno)| std::io::Error::from(errno))?;
            Ok(Self { _flock: flock })
        }

        #[cfg(not(unix))]
        {
            Ok(Self { _file: file })
        }
    }
}

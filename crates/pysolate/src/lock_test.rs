// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rstest::rstest;
use tempfile::TempDir;

use super::*;

#[rstest]
fn test_acquire_creates_lock_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(".tool.py-586390.lock");

    let lock = CreationLock::acquire(&path).unwrap();
    assert!(path.exists());
    drop(lock);

    // released on drop, so it can be taken again
    CreationLock::acquire(&path).unwrap();
}

#[rstest]
fn test_acquire_missing_directory_fails() {
    let tmp = TempDir::new().unwrap();
    assert!(CreationLock::acquire(&tmp.path().join("missing/.lock")).is_err());
}

#[cfg(unix)]
#[rstest]
fn test_second_holder_waits() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(".lock");
    let released = AtomicBool::new(false);

    let first = CreationLock::acquire(&path).unwrap();
    std::thread::scope(|scope| {
        let waiter = scope.spawn(|| {
            let _second = CreationLock::acquire(&path).unwrap();
            released.load(Ordering::SeqCst)
        });
        std::thread::sleep(Duration::from_millis(100));
        released.store(true, Ordering::SeqCst);
        drop(first);
        assert!(waiter.join().unwrap(), "lock was taken while still held");
    });
}

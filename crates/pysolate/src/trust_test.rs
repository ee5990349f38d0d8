// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

// sha256("hello\n")
const HELLO_SHA256: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

#[rstest]
fn test_sha256_hex() {
    assert_eq!(sha256_hex(b"hello\n"), HELLO_SHA256);
}

#[rstest]
fn test_verify_accepts_uppercase_pin() {
    verify_sha256("hello", b"hello\n", &HELLO_SHA256.to_uppercase()).expect("Should match");
}

#[rstest]
fn test_verify_mismatch_fails_closed() {
    let err = verify_sha256("hello", b"tampered\n", HELLO_SHA256).expect_err("Should mismatch");
    match err {
        Error::IntegrityMismatch {
            subject,
            expected,
            actual,
        } => {
            assert_eq!(subject, "hello");
            assert_eq!(expected, HELLO_SHA256);
            assert_eq!(actual, sha256_hex(b"tampered\n"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
fn test_read_verified() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bootstrap.py");
    std::fs::write(&path, "hello\n").unwrap();

    assert_eq!(read_verified(&path, HELLO_SHA256).unwrap(), b"hello\n");
    std::fs::write(&path, "hello!\n").unwrap();
    assert!(matches!(
        read_verified(&path, HELLO_SHA256),
        Err(Error::IntegrityMismatch { .. })
    ));
}

#[rstest]
fn test_cached_copy_is_not_refetched() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("cached.py");
    std::fs::write(&dest, "hello\n").unwrap();

    // the URL is unreachable; success proves no request was made
    let content = fetch_pinned("http://127.0.0.1:9/never", HELLO_SHA256, &dest).unwrap();
    assert_eq!(content, b"hello\n");
}

#[rstest]
fn test_tampered_cached_copy_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("cached.py");
    std::fs::write(&dest, "evil\n").unwrap();

    let err = fetch_pinned("http://127.0.0.1:9/never", HELLO_SHA256, &dest).unwrap_err();
    assert!(matches!(err, Error::IntegrityMismatch { .. }));
}

#[rstest]
fn test_failed_fetch_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("fetched.py");

    let err = fetch_pinned("http://127.0.0.1:9/never", HELLO_SHA256, &dest).unwrap_err();
    assert!(matches!(err, Error::Fetch { .. }));
    assert!(!dest.exists());
}

// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

use std::process::Command;

use rstest::rstest;
use tempfile::TempDir;

const SCRIPT: &str = "\
# /// pysolate
# python: \"9.9\"
# ///
print('unreachable')
";

#[rstest]
fn test_unsatisfiable_python_exits_with_diagnostic() {
    let tmp = TempDir::new().unwrap();
    let script = tmp.path().join("tool.py");
    std::fs::write(&script, SCRIPT).unwrap();
    let empty_path = tmp.path().join("bin");
    std::fs::create_dir_all(&empty_path).unwrap();
    let home = tmp.path().join("home");

    let output = Command::new(env!("CARGO_BIN_EXE_pysolate"))
        .arg("run")
        .arg(&script)
        .env_clear()
        .env("PATH", &empty_path)
        .env("PYSOLATE_HOME", &home)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Could not find a suitable python version for 9.9"),
        "unexpected stderr: {stderr}"
    );
    // only the creation lock may be left behind
    let created: Vec<_> = std::fs::read_dir(&home)
        .map(|entries| entries.flatten().map(|e| e.file_name()).collect())
        .unwrap_or_default();
    assert!(
        created.iter().all(|name| name.to_string_lossy().starts_with('.')),
        "unexpected environment: {created:?}"
    );
}

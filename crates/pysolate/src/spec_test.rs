// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::version::Version;

#[rstest]
fn test_script_without_header() {
    let spec = ScriptSpec::from_source("import sys\nprint(sys.argv)\n").expect("Should parse");
    assert!(spec.python.is_none());
    assert!(spec.dependencies.is_empty());
    assert!(spec.home.is_none());
}

#[rstest]
fn test_parse_full_header() {
    let source = r#"#!/usr/bin/env pysolate
# /// pysolate
# python: "3.8"
# dependencies:
#   - click >=7.0
#   - [requests, ">=2.0"]
# home: ~/.cache/pysolate
# venv: ./.venv
# log_level: debug
# ///

import click
"#;
    let spec = ScriptSpec::from_source(source).expect("Should parse full header");
    let python = spec.python.as_ref().expect("python should be present");
    assert!(python.matches(&Version::new(3, 8, 2)));
    assert!(!python.matches(&Version::new(3, 9, 0)));
    assert_eq!(spec.requirements(), vec!["click >=7.0", "requests>=2.0"]);
    assert_eq!(spec.home, Some(PathBuf::from("~/.cache/pysolate")));
    assert_eq!(spec.venv, Some(PathBuf::from("./.venv")));
    assert_eq!(spec.log_level, Some(LogLevel::Debug));
}

#[rstest]
fn test_bare_hash_lines_in_header() {
    let source = "# /// pysolate\n#dependencies:\n#\n#  - rich\n# ///\n";
    let spec = ScriptSpec::from_source(source).expect("Should parse");
    assert_eq!(spec.requirements(), vec!["rich"]);
}

#[rstest]
fn test_empty_header_is_default() {
    let spec = ScriptSpec::from_source("# /// pysolate\n# ///\n").expect("Should parse");
    assert!(spec.dependencies.is_empty());
}

#[rstest]
#[case("# /// pysolate\n# python: \"3.8\"\n")]
#[case("# /// pysolate\n# python: \"3.8\"\nimport os\n# ///\n")]
fn test_unterminated_header(#[case] source: &str) {
    let err = ScriptSpec::from_source(source).expect_err("Should reject");
    assert!(matches!(err, crate::Error::UnterminatedHeader { line: 1 }));
}

#[rstest]
#[case("# /// pysolate\n# dependencies: [unclosed\n# ///\n")]
#[case("# /// pysolate\n# python: \"three\"\n# ///\n")]
#[case("# /// pysolate\n# log_level: loud\n# ///\n")]
fn test_invalid_header(#[case] source: &str) {
    let err = ScriptSpec::from_source(source).expect_err("Should reject");
    assert!(matches!(err, crate::Error::InvalidHeader { .. }));
}

#[rstest]
fn test_pinned_dependency_requires_pair() {
    let source = "# /// pysolate\n# dependencies:\n#   - [requests, \">=2\", extra]\n# ///\n";
    assert!(ScriptSpec::from_source(source).is_err());
}

#[rstest]
fn test_load_records_source_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("tool.py");
    std::fs::write(&path, "# /// pysolate\n# dependencies: [attrs]\n# ///\n").unwrap();

    let spec = ScriptSpec::load(&path).expect("Should load");
    assert_eq!(spec.source_path, Some(path));
    assert_eq!(spec.requirements(), vec!["attrs"]);
}

#[rstest]
fn test_load_missing_file() {
    let tmp = TempDir::new().unwrap();
    let err = ScriptSpec::load(tmp.path().join("missing.py")).expect_err("Should fail");
    assert!(matches!(err, crate::Error::ReadFailed { .. }));
}

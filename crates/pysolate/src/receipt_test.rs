// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::config::LogLevel;
use crate::locator::InterpreterSource;
use crate::spec::Dependency;
use crate::version::VersionRequest;

fn interpreter(version: &str) -> Interpreter {
    Interpreter {
        path: PathBuf::from(format!("/usr/bin/python{version}")),
        version: Some(Version::parse(version).unwrap()),
        source: InterpreterSource::SearchPath,
    }
}

fn script(tmp: &TempDir, body: &str) -> PathBuf {
    let path = tmp.path().join("tool.py");
    std::fs::write(&path, body).unwrap();
    path
}

fn config(script: PathBuf, deps: &[&str], python: Option<&str>) -> BootstrapConfig {
    BootstrapConfig {
        script,
        dependencies: deps
            .iter()
            .map(|d| Dependency::Requirement(d.to_string()))
            .collect(),
        python: python.map(|p| p.parse::<VersionRequest>().unwrap()),
        home: PathBuf::from("/nonexistent/home"),
        venv: None,
        log_level: LogLevel::Info,
    }
}

#[rstest]
fn test_generate_records_script_and_interpreter() {
    let tmp = TempDir::new().unwrap();
    let script = script(&tmp, "print('hi')\n");

    let receipt = Receipt::generate(&script, &interpreter("3.8.2"), &["requests".into()], true)
        .unwrap();

    assert_eq!(receipt.api, ReceiptApiVersion::V0);
    assert_eq!(receipt.script.path, script);
    assert_eq!(receipt.script.sha256, sha256_hex(b"print('hi')\n"));
    assert_eq!(receipt.interpreter.version, Some(Version::new(3, 8, 2)));
    assert_eq!(receipt.dependencies, vec!["requests".to_string()]);
    assert!(receipt.install_ok);
    assert_eq!(receipt.generated.pysolate_version, env!("CARGO_PKG_VERSION"));
}

#[rstest]
fn test_save_and_load() {
    let tmp = TempDir::new().unwrap();
    let script = script(&tmp, "print('hi')\n");
    let path = tmp.path().join("pysolate.yaml");

    let receipt = Receipt::generate(&script, &interpreter("3.11.4"), &[], false).unwrap();
    receipt.save(&path).unwrap();

    let yaml = std::fs::read_to_string(&path).unwrap();
    assert!(yaml.contains("pysolate/v0/receipt"));
    assert_eq!(Receipt::load(&path).unwrap(), Some(receipt));
}

#[rstest]
fn test_load_missing_is_none() {
    let tmp = TempDir::new().unwrap();
    assert!(Receipt::load(&tmp.path().join("missing.yaml")).unwrap().is_none());
}

#[rstest]
fn test_load_garbage_fails() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pysolate.yaml");
    std::fs::write(&path, "api: something/else\n").unwrap();

    assert!(matches!(
        Receipt::load(&path),
        Err(crate::Error::InvalidReceipt { .. })
    ));
}

#[rstest]
fn test_verify_unchanged_is_clean() {
    let tmp = TempDir::new().unwrap();
    let script = script(&tmp, "print('hi')\n");
    let receipt =
        Receipt::generate(&script, &interpreter("3.8.2"), &["requests".into()], true).unwrap();

    let changes = verify_receipt(&receipt, &config(script, &["requests"], Some("3.8"))).unwrap();
    assert!(changes.is_empty(), "{changes:?}");
}

#[rstest]
fn test_verify_dependency_drift() {
    let tmp = TempDir::new().unwrap();
    let script = script(&tmp, "print('hi')\n");
    let receipt =
        Receipt::generate(&script, &interpreter("3.8.2"), &["requests".into()], true).unwrap();

    let changes = verify_receipt(&receipt, &config(script, &["pyyaml"], None)).unwrap();

    let kinds: Vec<_> = changes.iter().map(|c| (c.kind.clone(), c.reference.as_str())).collect();
    assert_eq!(
        kinds,
        vec![
            (ReceiptChangeKind::DependencyAdded, "pyyaml"),
            (ReceiptChangeKind::DependencyRemoved, "requests"),
        ]
    );
    assert!(changes.iter().all(|c| c.kind.is_drift()));
}

#[rstest]
#[case("3.8", false)]
#[case("3.9", true)]
#[case(">=3.10", true)]
#[case("<=3.8", false)]
fn test_verify_interpreter_mismatch(#[case] request: &str, #[case] mismatch: bool) {
    let tmp = TempDir::new().unwrap();
    let script = script(&tmp, "print('hi')\n");
    let receipt = Receipt::generate(&script, &interpreter("3.8.2"), &[], true).unwrap();

    let changes = verify_receipt(&receipt, &config(script, &[], Some(request))).unwrap();
    assert_eq!(
        changes
            .iter()
            .any(|c| c.kind == ReceiptChangeKind::InterpreterMismatch),
        mismatch
    );
}

#[rstest]
fn test_verify_script_changed_is_not_drift() {
    let tmp = TempDir::new().unwrap();
    let script = script(&tmp, "print('hi')\n");
    let receipt = Receipt::generate(&script, &interpreter("3.8.2"), &[], true).unwrap();
    std::fs::write(&script, "print('bye')\n").unwrap();

    let changes = verify_receipt(&receipt, &config(script, &[], None)).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ReceiptChangeKind::ScriptChanged);
    assert!(!changes[0].kind.is_drift());
}

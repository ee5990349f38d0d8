// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use rstest::rstest;

use super::*;

#[rstest]
fn test_empty_values_are_unset() {
    let ctx = ProcessContext::from_vars([(VIRTUAL_ENV, ""), (PATH, "/usr/bin")]);
    assert_eq!(ctx.marker(), None);
    assert!(ctx.contains(VIRTUAL_ENV));
    assert_eq!(ctx.search_path(), vec![PathBuf::from("/usr/bin")]);
}

#[rstest]
fn test_search_path_order() {
    let ctx = ProcessContext::from_vars([(PATH, "/a/bin:/b/bin:/usr/bin")]);
    assert_eq!(
        ctx.search_path(),
        vec![
            PathBuf::from("/a/bin"),
            PathBuf::from("/b/bin"),
            PathBuf::from("/usr/bin")
        ]
    );
}

#[rstest]
fn test_extra_requirements_split_on_lines() {
    let ctx = ProcessContext::from_vars([(PYSOLATE_DEPS, "click >=7.0\n\n  requests\n")]);
    assert_eq!(ctx.extra_requirements(), vec!["click >=7.0", "requests"]);
    assert!(ProcessContext::default().extra_requirements().is_empty());
}

#[rstest]
fn test_changes_applied_to_context() {
    let ctx = ProcessContext::from_vars([(VIRTUAL_ENV, "/old"), ("HOME", "/home/me")]);
    let mut changes = EnvChanges::default();
    changes.remove(VIRTUAL_ENV);
    changes.set(PYSOLATE_RESTARTED, "/new");

    let next = ctx.with_changes(&changes);
    assert_eq!(next.marker(), None);
    assert_eq!(next.get_str(PYSOLATE_RESTARTED), Some("/new"));
    assert_eq!(next.get_str("HOME"), Some("/home/me"));
    // the original snapshot is untouched
    assert_eq!(ctx.marker(), Some(PathBuf::from("/old")));
}

#[rstest]
fn test_set_and_remove_are_exclusive() {
    let mut changes = EnvChanges::default();
    changes.remove(VIRTUAL_ENV);
    changes.set(VIRTUAL_ENV, "/env");
    assert!(!changes.is_removed(VIRTUAL_ENV));
    assert_eq!(changes.get_set(VIRTUAL_ENV), Some(OsStr::new("/env")));

    let mut later = EnvChanges::default();
    later.remove(VIRTUAL_ENV);
    changes.extend(&later);
    assert!(changes.is_removed(VIRTUAL_ENV));
    assert_eq!(changes.get_set(VIRTUAL_ENV), None);
}

#[rstest]
fn test_relevant_vars_filter() {
    let ctx = ProcessContext::from_vars([
        ("PYENV_ROOT", "/pyenv"),
        ("_OLD_VIRTUAL_PATH", "/usr/bin"),
        ("PYSOLATE_HOME", "/data"),
        ("VIRTUAL_ENV", "/env"),
        ("PATH", "/usr/bin"),
        ("HOME", "/home/me"),
    ]);
    let keys: Vec<_> = ctx.relevant_vars().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec!["PATH", "PYENV_ROOT", "PYSOLATE_HOME", "VIRTUAL_ENV", "_OLD_VIRTUAL_PATH"]
    );
}

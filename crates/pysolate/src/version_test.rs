// Copyright (c) Contributors to the pysolate project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
#[case("3.8.2", Version::new(3, 8, 2))]
#[case("3.8", Version::new(3, 8, 0))]
#[case("3.13.0rc1", Version::new(3, 13, 0).with_release(ReleaseStage::Candidate, Some(1)))]
#[case("3.12.0b4", Version::new(3, 12, 0).with_release(ReleaseStage::Beta, Some(4)))]
#[case("2.7.18", Version::new(2, 7, 18))]
fn test_parse_version(#[case] input: &str, #[case] expected: Version) {
    assert_eq!(Version::parse(input).unwrap(), expected);
}

#[rstest]
#[case("system")]
#[case("3")]
#[case("3.8.2-dev")]
#[case("miniconda3-4.7.12")]
fn test_parse_rejects_non_versions(#[case] input: &str) {
    assert!(Version::parse(input).is_err());
}

#[rstest]
fn test_missing_stage_defaults_to_final() {
    let version = Version::parse("3.9").unwrap();
    assert_eq!(version.stage, ReleaseStage::Final);
    assert_eq!(version.serial, None);
    assert_eq!(version.to_string(), "3.9.0");
}

#[rstest]
fn test_format_versions() {
    assert_eq!(Version::new(3, 8, 2).to_string(), "3.8.2");
    let alpha = Version::new(1, 0, 0).with_release(ReleaseStage::Alpha, Some(2));
    assert_eq!(alpha.to_string(), "1.0.0a2");
}

#[rstest]
fn test_find_in_version_output() {
    assert_eq!(Version::find_in("Python 3.8.2\n"), Some(Version::new(3, 8, 2)));
    assert_eq!(
        Version::find_in("Python 3.14.0a3+"),
        Some(Version::new(3, 14, 0).with_release(ReleaseStage::Alpha, Some(3)))
    );
    assert_eq!(Version::find_in("command not found"), None);
}

#[rstest]
fn test_tuple_ordering() {
    let mut versions = vec![
        Version::parse("3.10.0").unwrap(),
        Version::parse("3.10.0rc2").unwrap(),
        Version::parse("3.9.18").unwrap(),
        Version::parse("3.10.0a1").unwrap(),
    ];
    versions.sort();
    let formatted: Vec<_> = versions.iter().map(Version::to_string).collect();
    assert_eq!(formatted, vec!["3.9.18", "3.10.0a1", "3.10.0rc2", "3.10.0"]);
}

#[rstest]
#[case("3.8", "3.8.2", true)]
#[case("3.8", "3.9.0", false)]
#[case("3", "3.11.4", true)]
#[case("3.8.1", "3.8.2", false)]
#[case("<=3.6", "3.6.15", true)]
#[case("<=3.6", "3.8.2", false)]
#[case(">=3.6", "3.8.2", true)]
#[case("<3.9", "3.9.0", false)]
#[case("!=3.9", "3.10.1", true)]
#[case("==3.9", "3.9.7", true)]
fn test_request_matches(#[case] request: &str, #[case] candidate: &str, #[case] expected: bool) {
    let request: VersionRequest = request.parse().unwrap();
    let candidate = Version::parse(candidate).unwrap();
    assert_eq!(request.matches(&candidate), expected);
}

#[rstest]
#[case("")]
#[case("three")]
#[case(">=")]
#[case("3.8.2.1")]
#[case("~=3.8")]
fn test_invalid_requests(#[case] request: &str) {
    assert!(request.parse::<VersionRequest>().is_err());
}

#[rstest]
fn test_predicate_request() {
    let request = VersionRequest::predicate("final releases", |v| v.stage == ReleaseStage::Final);
    assert!(request.matches(&Version::new(3, 12, 1)));
    assert!(!request.matches(&Version::parse("3.13.0b1").unwrap()));
    assert_eq!(request.to_string(), "final releases");
}

#[rstest]
fn test_request_display_round_trips() {
    for text in ["3.8", "<=3.6", ">=3.10.2"] {
        let request: VersionRequest = text.parse().unwrap();
        assert_eq!(request.to_string(), text);
    }
}

#[rstest]
fn test_version_serializes_as_string() {
    let version = Version::new(3, 11, 2).with_release(ReleaseStage::Candidate, Some(1));
    let yaml = serde_yaml::to_string(&version).unwrap();
    assert!(yaml.contains("3.11.2rc1"));
    let parsed: Version = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, version);
}

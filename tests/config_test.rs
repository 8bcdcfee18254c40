// tests/config_test.rs
use flex_version::config::{load_config, Config, FALLBACK_RULE};
use flex_version::domain::VersionSourceKind;
use flex_version::FlexVersionError;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_load_default_config() {
    let config = Config::default();
    let rule = &config.branches[FALLBACK_RULE];

    assert_eq!(config.branches.len(), 1);
    assert_eq!(rule.on_commit.get("patch"), Some(&"+1".to_string()));
    assert_eq!(
        rule.output.get("SemVer"),
        Some(&"<Match:major>.<Match:minor>.<Match:patch>".to_string())
    );
    assert_eq!(rule.version_source.order, vec![VersionSourceKind::Tag]);
    assert!(rule.version_source.iterate_first_parent_only);
    assert!(config.output.strict);
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[output]
date_format = "%Y-%m-%d"
strict = false

[[output.clean]]
select = "Label"
invalid_pattern = "[^0-9A-Za-z-]"
replacement = "-"

[branches.release]
regex = "^release/"

[branches.release.version_source]
order = ["merge", "tag"]
max_commits_to_analyze = 50

[[branches.release.version_source.merge_match.routes]]
from = "feature"
to = "release"

[branches.release.on_merge."*"]
minor = "+1"
patch = "=0"

[branches.release.output]
SemVer = "<Match:major>.<Match:minor>.<Match:patch>"
Label = "<GitInfo:ShortBranchName>"

[branches."*"]
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = load_config(Some(temp_file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.output.date_format, "%Y-%m-%d");
    assert!(!config.output.strict);
    assert_eq!(config.output.clean.len(), 1);

    let names: Vec<&str> = config.branches.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["release", "*"]);

    let release = &config.branches["release"];
    assert_eq!(
        release.version_source.order,
        vec![VersionSourceKind::Merge, VersionSourceKind::Tag]
    );
    assert_eq!(release.version_source.commit_limit(), Some(50));
    assert_eq!(release.version_source.merge_match.routes[0].pattern, None);

    let merge_actions: Vec<(&str, &str)> = release.on_merge["*"]
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    assert_eq!(merge_actions, vec![("minor", "+1"), ("patch", "=0")]);

    let outputs: Vec<&str> = release.output.keys().map(String::as_str).collect();
    assert_eq!(outputs, vec!["SemVer", "Label"]);
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");

    let err = load_config(Some(missing.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, FlexVersionError::Config(_)));
}

#[test]
fn test_malformed_file_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[branches.\"*\"\nregex = ").unwrap();
    temp_file.flush().unwrap();

    let err = load_config(Some(temp_file.path().to_str().unwrap())).unwrap_err();
    assert!(err.to_string().contains("Cannot parse configuration"));
}

#[test]
#[serial]
fn test_discovers_config_in_current_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("flexversion.toml"),
        r#"
[branches.main]
regex = "^main$"

[branches."*"]
"#,
    )
    .unwrap();

    let original_dir = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let config = load_config(None);
    env::set_current_dir(original_dir).unwrap();

    let config = config.unwrap();
    assert!(config.branches.contains_key("main"));
}

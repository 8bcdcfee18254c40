use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analyzer::bump::BumpAction;
use crate::domain::VersionSourceKind;
use crate::error::{FlexVersionError, Result};
use crate::template::functions::is_valid_date_format;

/// Name of the mandatory fallback branch rule.
pub const FALLBACK_RULE: &str = "*";

/// File name looked up in the working directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "flexversion.toml";

/// Represents the complete configuration for flex-version.
///
/// Branch rules are kept in document order: the first rule whose regex matches
/// the current branch wins, so the order of `[branches.*]` tables matters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub branches: IndexMap<String, BranchRule>,
}

/// Global settings for rendering output templates.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    /// strftime format used for every date exposed to templates.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// When true, template errors abort the analysis. When false they are
    /// rendered inline as `name(args)` and logged as warnings.
    #[serde(default = "default_true")]
    pub strict: bool,

    #[serde(default)]
    pub clean: Vec<CleanOutputRule>,
}

/// Regex-replace applied to outputs whose name matches `select`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CleanOutputRule {
    pub select: String,
    pub invalid_pattern: String,
    #[serde(default)]
    pub replacement: String,
}

/// Named configuration block controlling matching, source detection, bump
/// actions and output templates for branches matching `regex`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BranchRule {
    #[serde(default)]
    pub regex: String,

    #[serde(default)]
    pub version_source: VersionSourceConfig,

    /// Parameter name -> bump action, applied for every plain commit.
    #[serde(default)]
    pub on_commit: IndexMap<String, String>,

    /// Source branch rule name (or `*`) -> parameter name -> bump action.
    #[serde(default)]
    pub on_merge: IndexMap<String, IndexMap<String, String>>,

    /// Output name -> template, rendered in order.
    #[serde(default)]
    pub output: IndexMap<String, String>,
}

/// Defines how version sources are detected.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VersionSourceConfig {
    /// Source kinds to try for each commit, highest priority first.
    #[serde(default = "default_order")]
    pub order: Vec<VersionSourceKind>,

    #[serde(default = "default_true")]
    pub iterate_first_parent_only: bool,

    /// Zero, negative or absent means the walk is unbounded.
    #[serde(default)]
    pub max_commits_to_analyze: Option<i64>,

    #[serde(default)]
    pub tag_match: TagMatchConfig,

    #[serde(default)]
    pub merge_match: MergeMatchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TagMatchConfig {
    #[serde(default = "default_tag_pattern")]
    pub pattern: String,

    #[serde(default)]
    pub annotated_only: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MergeMatchConfig {
    /// Extracts the `From` and `To` branch names out of a merge message.
    #[serde(default = "default_from_to_pattern")]
    pub from_to_pattern: String,

    #[serde(default)]
    pub routes: Vec<MergeRoute>,
}

/// An allowed (from rule, to rule) pair for merge version sources.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MergeRoute {
    pub from: String,
    pub to: String,
    /// Content pattern for the merge message. Falls back to the tag pattern.
    #[serde(default)]
    pub pattern: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_date_format() -> String {
    "%Y-%m-%dT%H:%M:%S%:z".to_string()
}

fn default_order() -> Vec<VersionSourceKind> {
    vec![VersionSourceKind::Tag]
}

fn default_tag_pattern() -> String {
    r"^v?(?<major>\d+)\.(?<minor>\d+)\.(?<patch>\d+)$".to_string()
}

fn default_from_to_pattern() -> String {
    r"Merge (?:remote-tracking )?branch '(?<From>[^']+)'(?: into (?<To>\S+))?".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            date_format: default_date_format(),
            strict: true,
            clean: Vec::new(),
        }
    }
}

impl Default for VersionSourceConfig {
    fn default() -> Self {
        VersionSourceConfig {
            order: default_order(),
            iterate_first_parent_only: true,
            max_commits_to_analyze: None,
            tag_match: TagMatchConfig::default(),
            merge_match: MergeMatchConfig::default(),
        }
    }
}

impl Default for TagMatchConfig {
    fn default() -> Self {
        TagMatchConfig {
            pattern: default_tag_pattern(),
            annotated_only: false,
        }
    }
}

impl Default for MergeMatchConfig {
    fn default() -> Self {
        MergeMatchConfig {
            from_to_pattern: default_from_to_pattern(),
            routes: Vec::new(),
        }
    }
}

impl VersionSourceConfig {
    /// The positive commit limit, if the walk is bounded.
    pub fn commit_limit(&self) -> Option<usize> {
        match self.max_commits_to_analyze {
            Some(n) if n > 0 => Some(n as usize),
            _ => None,
        }
    }

    pub fn includes(&self, kind: VersionSourceKind) -> bool {
        self.order.contains(&kind)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut on_commit = IndexMap::new();
        on_commit.insert("patch".to_string(), "+1".to_string());

        let mut output = IndexMap::new();
        output.insert(
            "SemVer".to_string(),
            "<Match:major>.<Match:minor>.<Match:patch>".to_string(),
        );

        let mut branches = IndexMap::new();
        branches.insert(
            FALLBACK_RULE.to_string(),
            BranchRule {
                on_commit,
                output,
                ..BranchRule::default()
            },
        );

        Config {
            output: OutputConfig::default(),
            branches,
        }
    }
}

impl Config {
    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)
            .map_err(|e| FlexVersionError::config(format!("Cannot parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for faults that would otherwise only surface
    /// halfway through an analysis.
    pub fn validate(&self) -> Result<()> {
        if !self.branches.contains_key(FALLBACK_RULE) {
            return Err(FlexVersionError::config(format!(
                "The required '{}' fallback branch definition was not found",
                FALLBACK_RULE
            )));
        }

        if !is_valid_date_format(&self.output.date_format) {
            return Err(FlexVersionError::config(format!(
                "The date format '{}' is not a valid strftime format",
                self.output.date_format
            )));
        }

        for clean in &self.output.clean {
            compile_pattern("output selector", &clean.select)?;
            compile_pattern("invalid-character", &clean.invalid_pattern)?;
        }

        for (name, rule) in &self.branches {
            if !rule.regex.trim().is_empty() {
                compile_pattern(&format!("branch '{}'", name), &rule.regex)?;
            }

            let source = &rule.version_source;
            compile_pattern("tag-match", &source.tag_match.pattern)?;
            Regex::new(&source.merge_match.from_to_pattern).map_err(|e| {
                FlexVersionError::regex("merge from/to", &source.merge_match.from_to_pattern, e)
            })?;
            for route in &source.merge_match.routes {
                if let Some(pattern) = &route.pattern {
                    compile_pattern("merge-content", pattern)?;
                }
            }

            for action in rule.on_commit.values() {
                BumpAction::parse(action)?;
            }
            for actions in rule.on_merge.values() {
                for action in actions.values() {
                    BumpAction::parse(action)?;
                }
            }
        }

        Ok(())
    }
}

/// Compile a configured pattern with case-insensitive matching.
pub fn compile_pattern(context: &str, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| FlexVersionError::regex(context, pattern, e))
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter (must exist)
/// 2. `flexversion.toml` in current directory
/// 3. `flexversion.toml` in the user config directory
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        if !Path::new(path).exists() {
            return Err(FlexVersionError::config(format!(
                "The configuration file cannot be found at '{}'",
                path
            )));
        }
        fs::read_to_string(path)?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    Config::from_toml_str(&config_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.branches.contains_key(FALLBACK_RULE));
    }

    #[test]
    fn test_branch_order_follows_document() {
        let config = Config::from_toml_str(
            r#"
[branches.zeta]
regex = "^zeta$"

[branches.alpha]
regex = "^alpha$"

[branches."*"]
"#,
        )
        .unwrap();
        let names: Vec<&str> = config.branches.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "*"]);
    }

    #[test]
    fn test_missing_fallback_rejected() {
        let err = Config::from_toml_str("[branches.main]\nregex = \"^main$\"\n").unwrap_err();
        assert!(err.to_string().contains("'*'"));
    }

    #[test]
    fn test_bad_bump_action_rejected() {
        let err = Config::from_toml_str(
            r#"
[branches."*".on_commit]
patch = "++1"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("<[+-=]><number>"));
    }

    #[test]
    fn test_bad_regex_rejected() {
        let err = Config::from_toml_str(
            r#"
[branches."*".version_source.tag_match]
pattern = "(?<major>\\d+"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("tag-match"));
    }

    #[test]
    fn test_commit_limit() {
        let mut source = VersionSourceConfig::default();
        assert_eq!(source.commit_limit(), None);
        source.max_commits_to_analyze = Some(0);
        assert_eq!(source.commit_limit(), None);
        source.max_commits_to_analyze = Some(-3);
        assert_eq!(source.commit_limit(), None);
        source.max_commits_to_analyze = Some(25);
        assert_eq!(source.commit_limit(), Some(25));
    }

    #[test]
    fn test_compile_pattern_is_case_insensitive() {
        let re = compile_pattern("test", "^release/").unwrap();
        assert!(re.is_match("Release/1.0"));
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let err = Config::from_toml_str(
            r#"
[output]
date_format = "%Y-%Q"

[branches."*"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("%Y-%Q"));
    }
}

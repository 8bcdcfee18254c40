//! Version analysis: branch rule selection, version source discovery, bump
//! replay and output rendering.

pub mod branch_matcher;
pub mod bump;
pub mod tag_scanner;
pub mod version_source;

pub use branch_matcher::BranchMatcher;
pub use bump::{BumpAction, BumpEngine};
pub use tag_scanner::TagScanner;
pub use version_source::{Resolution, VersionSourceResolver};

use chrono::{DateTime, FixedOffset, Local};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, Dispatch};

use crate::config::{BranchRule, Config};
use crate::domain::{Commit, GitInfo, ParameterSet, VersionSource};
use crate::error::{FlexVersionError, Result};
use crate::git::{Git2Repository, Repository};
use crate::template::functions::format_date;
use crate::template::{Environment, OutputRenderer};

/// Everything one analysis produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub branch_rule_name: String,
    pub branch_rule: BranchRule,
    pub version_source: VersionSource,
    /// Parameters after every bump action was applied
    pub parameters: ParameterSet,
    pub bumps_applied: usize,
    pub git_info: GitInfo,
    pub output: IndexMap<String, String>,
}

/// State carried from the repository phase to the render phase.
struct Resolved<'c> {
    rule_name: &'c str,
    rule: &'c BranchRule,
    source: VersionSource,
    git_info: GitInfo,
    parameters: ParameterSet,
    bumps_applied: usize,
}

/// Runs analyses for one configuration.
///
/// An `Analyzer` holds no per-run state, so one instance can analyze any
/// number of repositories.
pub struct Analyzer {
    config: Config,
    arguments: IndexMap<String, String>,
    diagnostic: bool,
    dispatch: Option<Dispatch>,
}

impl Analyzer {
    pub fn new(config: Config) -> Self {
        Analyzer {
            config,
            arguments: IndexMap::new(),
            diagnostic: false,
            dispatch: None,
        }
    }

    /// Supply `key=value` arguments for the `Arg` namespace.
    pub fn with_arguments<I, S>(mut self, raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.arguments = parse_arguments(raw);
        self
    }

    /// Keep `_`-prefixed intermediate outputs in the result.
    pub fn diagnostic(mut self, diagnostic: bool) -> Self {
        self.diagnostic = diagnostic;
        self
    }

    /// Route this analyzer's log events to `dispatch` instead of the
    /// host's default subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn arguments(&self) -> &IndexMap<String, String> {
        &self.arguments
    }

    /// Analyze an already opened repository.
    pub fn analyze<R: Repository>(&self, repo: &R) -> Result<AnalysisResult> {
        self.scoped(|| {
            let resolved = self.resolve(repo)?;
            self.render(resolved)
        })
    }

    /// Open the repository containing `path` and analyze it.
    ///
    /// The repository is closed before outputs are rendered.
    pub fn analyze_path(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        self.scoped(|| {
            let resolved = {
                let repo = Git2Repository::open(path)?;
                self.resolve(&repo)?
            };
            self.render(resolved)
        })
    }

    fn scoped<T>(&self, run: impl FnOnce() -> T) -> T {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, run),
            None => run(),
        }
    }

    fn resolve<R: Repository>(&self, repo: &R) -> Result<Resolved<'_>> {
        let branch_name = repo.current_branch_name()?;
        let matcher = BranchMatcher::new(&self.config.branches)?;
        let (rule_name, rule) = matcher.resolve(&branch_name)?;
        info!(branch = %branch_name, rule = %rule_name, "Using branch rule");

        let Resolution { source, git_info } =
            VersionSourceResolver::new(rule, &matcher)?.resolve(repo, &branch_name)?;

        let mut parameters = source.parameters.clone();
        let bumps_applied = BumpEngine::new(rule).replay(&git_info.commits, &mut parameters)?;
        debug!(
            commits = git_info.commits_since_source(),
            bumps = bumps_applied,
            "Replayed commits since version source"
        );

        Ok(Resolved {
            rule_name,
            rule,
            source,
            git_info,
            parameters,
            bumps_applied,
        })
    }

    fn render(&self, resolved: Resolved<'_>) -> Result<AnalysisResult> {
        let mut env = self.environment(&resolved)?;
        let renderer = OutputRenderer::new(&self.config.output, self.diagnostic)?;
        let output = renderer.render(&resolved.rule.output, &mut env)?;

        Ok(AnalysisResult {
            branch_rule_name: resolved.rule_name.to_string(),
            branch_rule: resolved.rule.clone(),
            version_source: resolved.source,
            parameters: resolved.parameters,
            bumps_applied: resolved.bumps_applied,
            git_info: resolved.git_info,
            output,
        })
    }

    fn environment(&self, resolved: &Resolved<'_>) -> Result<Environment> {
        let date_format = self.config.output.date_format.as_str();
        let git_info = &resolved.git_info;
        let source = &resolved.source;

        let mut git_fields = IndexMap::new();
        git_fields.insert("BranchName".to_string(), git_info.branch_name.clone());
        git_fields.insert(
            "ShortBranchName".to_string(),
            git_info.short_branch_name().to_string(),
        );
        git_fields.insert("Path".to_string(), git_info.path.clone());
        git_fields.insert("Now".to_string(), format_config_date(&Local::now().into(), date_format)?);
        git_fields.insert(
            "CommitCount".to_string(),
            git_info.commits_since_source().to_string(),
        );

        let head = match git_info.head() {
            Some(head) => commit_fields(head, date_format)?,
            None => IndexMap::new(),
        };

        let mut version_source = commit_fields(&source.commit, date_format)?;
        version_source.insert("Kind".to_string(), source.kind.to_string());
        version_source.insert("TagName".to_string(), source.tag_name().to_string());
        version_source.insert("TagMessage".to_string(), source.tag_message().to_string());

        Ok(Environment {
            args: self.arguments.clone(),
            git_info: git_fields,
            head,
            parameters: resolved.parameters.as_map().clone(),
            version_source,
            outputs: IndexMap::new(),
        })
    }
}

fn commit_fields(commit: &Commit, date_format: &str) -> Result<IndexMap<String, String>> {
    let mut fields = IndexMap::new();
    fields.insert("Author".to_string(), commit.author.clone());
    fields.insert("Date".to_string(), format_config_date(&commit.date, date_format)?);
    fields.insert("Sha".to_string(), commit.sha.clone());
    fields.insert("ShortSha".to_string(), commit.short_sha().to_string());
    fields.insert("Message".to_string(), commit.message.clone());
    fields.insert("MessageShort".to_string(), commit.message_short.clone());
    Ok(fields)
}

fn format_config_date(date: &DateTime<FixedOffset>, date_format: &str) -> Result<String> {
    format_date(date, date_format).map_err(FlexVersionError::config)
}

/// Parse `key=value` arguments.
///
/// The value is everything after the first `=`. Entries without `=` or with
/// an empty key are skipped; a repeated key keeps its last value.
pub fn parse_arguments<I, S>(raw: I) -> IndexMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut arguments = IndexMap::new();
    for entry in raw {
        let entry = entry.as_ref();
        match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                arguments.insert(key.trim().to_string(), value.to_string());
            }
            _ => debug!(argument = %entry, "Ignoring argument that is not key=value"),
        }
    }
    arguments
}

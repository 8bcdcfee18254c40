use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::analyzer::branch_matcher::BranchMatcher;
use crate::analyzer::tag_scanner::{TagCandidate, TagScanner};
use crate::config::{compile_pattern, BranchRule, MergeRoute};
use crate::domain::{Commit, GitInfo, ParameterSet, VersionSource, VersionSourceKind};
use crate::error::{FlexVersionError, Result};
use crate::git::{CommitIter, Repository};

/// The version source together with everything walked to find it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub source: VersionSource,
    pub git_info: GitInfo,
}

/// Walks history from HEAD to find the commit that acts as version source.
pub struct VersionSourceResolver<'a> {
    rule: &'a BranchRule,
    matcher: &'a BranchMatcher<'a>,
    from_to_pattern: Regex,
    routes: Vec<(&'a MergeRoute, Regex)>,
}

impl<'a> VersionSourceResolver<'a> {
    pub fn new(rule: &'a BranchRule, matcher: &'a BranchMatcher<'a>) -> Result<Self> {
        let source = &rule.version_source;
        let tag_pattern = compile_pattern("tag-match", &source.tag_match.pattern)?;
        let from_to_pattern = Regex::new(&source.merge_match.from_to_pattern).map_err(|e| {
            FlexVersionError::regex("merge from/to", &source.merge_match.from_to_pattern, e)
        })?;

        let mut routes = Vec::with_capacity(source.merge_match.routes.len());
        for route in &source.merge_match.routes {
            let regex = match &route.pattern {
                Some(pattern) => compile_pattern("merge-content", pattern)?,
                None => tag_pattern.clone(),
            };
            routes.push((route, regex));
        }

        Ok(VersionSourceResolver {
            rule,
            matcher,
            from_to_pattern,
            routes,
        })
    }

    /// Find the version source reachable from HEAD.
    ///
    /// Every visited commit, the source included, ends up in the returned
    /// git info, newest first. Nothing older than the source is visited.
    pub fn resolve<R: Repository>(&self, repo: &R, branch_name: &str) -> Result<Resolution> {
        let source_config = &self.rule.version_source;

        let candidates = if source_config.includes(VersionSourceKind::Tag) {
            TagScanner::new(&source_config.tag_match)?.scan(repo.tags()?)
        } else {
            HashMap::new()
        };
        debug!(candidates = candidates.len(), "Tag candidates found");

        let history = repo.walk_history(source_config.iterate_first_parent_only)?;
        let history: CommitIter<'_> = match source_config.commit_limit() {
            Some(limit) => Box::new(history.take(limit)),
            None => history,
        };

        let mut commits = Vec::new();
        let mut parameters = ParameterSet::new();

        for info in history {
            let mut commit = Commit::from(info?);
            if commit.is_merge {
                self.classify_merge(&mut commit);
            }
            trace!(sha = %commit.sha, merge = commit.is_merge, "Examining commit");

            let kind = self.detect(&mut commit, &candidates, &mut parameters)?;
            commits.push(commit);

            if let Some(kind) = kind {
                let source_commit = commits[commits.len() - 1].clone();
                debug!(
                    sha = %source_commit.sha,
                    kind = %kind,
                    examined = commits.len(),
                    "Found version source"
                );

                return Ok(Resolution {
                    source: VersionSource {
                        commit: source_commit,
                        kind,
                        parameters,
                    },
                    git_info: GitInfo {
                        path: repo.path(),
                        branch_name: branch_name.to_string(),
                        commits,
                    },
                });
            }
        }

        Err(FlexVersionError::VersionSourceNotFound {
            branch: branch_name.to_string(),
            examined: commits.len(),
        })
    }

    /// Resolve the from/to branch rules named in a merge message.
    fn classify_merge(&self, commit: &mut Commit) {
        let (from, to) = match self.from_to_pattern.captures(&commit.message) {
            Some(caps) => (
                caps.name("From").map_or("", |m| m.as_str()),
                caps.name("To").map_or("", |m| m.as_str()),
            ),
            None => ("", ""),
        };

        commit.from_branch_rule = self.matcher.classify(from).map(str::to_string);
        commit.to_branch_rule = self.matcher.classify(to).map(str::to_string);
        trace!(
            from = %from,
            to = %to,
            from_rule = ?commit.from_branch_rule,
            to_rule = ?commit.to_branch_rule,
            "Classified merge"
        );
    }

    /// Try each configured source kind in priority order; the first match wins.
    fn detect(
        &self,
        commit: &mut Commit,
        candidates: &HashMap<String, TagCandidate>,
        parameters: &mut ParameterSet,
    ) -> Result<Option<VersionSourceKind>> {
        for kind in &self.rule.version_source.order {
            let matched = match kind {
                VersionSourceKind::Tag => self.match_tag(commit, candidates, parameters)?,
                VersionSourceKind::Merge => self.match_merge(commit, parameters)?,
            };
            if matched {
                return Ok(Some(*kind));
            }
        }

        Ok(None)
    }

    fn match_tag(
        &self,
        commit: &mut Commit,
        candidates: &HashMap<String, TagCandidate>,
        parameters: &mut ParameterSet,
    ) -> Result<bool> {
        let Some(candidate) = candidates.get(&commit.sha) else {
            return Ok(false);
        };

        commit.tag = Some(candidate.tag.clone());
        parameters.extend_new(candidate.captures.iter().cloned())?;
        Ok(true)
    }

    fn match_merge(&self, commit: &Commit, parameters: &mut ParameterSet) -> Result<bool> {
        if !commit.is_merge {
            return Ok(false);
        }
        let (Some(from), Some(to)) = (&commit.from_branch_rule, &commit.to_branch_rule) else {
            return Ok(false);
        };

        for (route, regex) in &self.routes {
            if &route.from != from || &route.to != to {
                continue;
            }
            let Some(caps) = regex.captures(&commit.message_short) else {
                continue;
            };

            // Every group is kept, unnamed and unmatched ones included.
            let captures = regex.capture_names().enumerate().map(|(index, name)| {
                let key = name.map_or_else(|| index.to_string(), str::to_string);
                let value = caps.get(index).map_or("", |m| m.as_str()).to_string();
                (key, value)
            });
            parameters.extend_new(captures)?;
            return Ok(true);
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MergeMatchConfig};
    use crate::git::MockRepository;
    use indexmap::IndexMap;

    fn branches(rule: BranchRule) -> IndexMap<String, BranchRule> {
        let mut branches = IndexMap::new();
        branches.insert(
            "main".to_string(),
            BranchRule {
                regex: "^main$".to_string(),
                ..BranchRule::default()
            },
        );
        branches.insert(
            "release".to_string(),
            BranchRule {
                regex: "^release/".to_string(),
                ..BranchRule::default()
            },
        );
        branches.insert(
            "feature".to_string(),
            BranchRule {
                regex: "^feature/".to_string(),
                ..BranchRule::default()
            },
        );
        branches.insert("*".to_string(), rule);
        branches
    }

    fn resolve(rule: BranchRule, repo: &MockRepository) -> Result<Resolution> {
        let branches = branches(rule);
        let matcher = BranchMatcher::new(&branches).unwrap();
        let resolver = VersionSourceResolver::new(&branches["*"], &matcher)?;
        resolver.resolve(repo, "main")
    }

    fn merge_rule(order: Vec<VersionSourceKind>) -> BranchRule {
        let mut rule = BranchRule::default();
        rule.version_source.order = order;
        rule.version_source.merge_match = MergeMatchConfig {
            routes: vec![MergeRoute {
                from: "release".to_string(),
                to: "main".to_string(),
                pattern: None,
            }],
            ..MergeMatchConfig::default()
        };
        rule.version_source.tag_match.pattern =
            r"(?<major>\d+)\.(?<minor>\d+)\.(?<patch>\d+)".to_string();
        rule
    }

    #[test]
    fn test_stops_at_most_recent_tag() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .commit("b", "tagged old")
            .commit("c", "tagged new")
            .commit("d", "work")
            .tag("v1.0.0", "b")
            .tag("v1.1.0", "c");

        let resolution = resolve(Config::default().branches["*"].clone(), &repo).unwrap();

        assert_eq!(resolution.source.commit.sha, "c");
        assert_eq!(resolution.source.kind, VersionSourceKind::Tag);
        assert_eq!(resolution.source.parameters.get("minor"), Some("1"));
        let walked: Vec<&str> = resolution
            .git_info
            .commits
            .iter()
            .map(|c| c.sha.as_str())
            .collect();
        assert_eq!(walked, vec!["d", "c"]);
        assert_eq!(
            resolution.source.commit.tag.as_ref().map(|t| t.name.as_str()),
            Some("v1.1.0")
        );
    }

    #[test]
    fn test_head_can_be_the_source() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial").tag("v0.1.0", "a");

        let resolution = resolve(BranchRule::default(), &repo).unwrap();
        assert_eq!(resolution.git_info.commits.len(), 1);
        assert_eq!(resolution.git_info.head().unwrap().sha, "a");
    }

    #[test]
    fn test_no_source_is_an_error() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial").commit("b", "more").tag("nightly", "a");

        let err = resolve(BranchRule::default(), &repo).unwrap_err();
        match err {
            FlexVersionError::VersionSourceNotFound { branch, examined } => {
                assert_eq!(branch, "main");
                assert_eq!(examined, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_commit_limit_bounds_the_walk() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .commit("b", "one")
            .commit("c", "two")
            .commit("d", "three")
            .tag("v1.0.0", "a");

        let mut rule = BranchRule::default();
        rule.version_source.max_commits_to_analyze = Some(2);
        let err = resolve(rule.clone(), &repo).unwrap_err();
        assert!(matches!(
            err,
            FlexVersionError::VersionSourceNotFound { examined: 2, .. }
        ));

        rule.version_source.max_commits_to_analyze = Some(0);
        assert_eq!(resolve(rule, &repo).unwrap().source.commit.sha, "a");
    }

    #[test]
    fn test_tags_ignored_when_not_in_order() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial").tag("v1.0.0", "a");

        let rule = merge_rule(vec![VersionSourceKind::Merge]);
        assert!(matches!(
            resolve(rule, &repo),
            Err(FlexVersionError::VersionSourceNotFound { .. })
        ));
    }

    #[test]
    fn test_merge_source_captures_all_groups() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .side_commit("r1", "prepare release")
            .merge("m", "Merge branch 'release/2.4.1' into main")
            .commit("b", "after release");

        let resolution = resolve(merge_rule(vec![VersionSourceKind::Merge]), &repo).unwrap();

        let source = &resolution.source;
        assert_eq!(source.kind, VersionSourceKind::Merge);
        assert_eq!(source.commit.sha, "m");
        assert_eq!(source.commit.from_branch_rule.as_deref(), Some("release"));
        assert_eq!(source.commit.to_branch_rule.as_deref(), Some("main"));
        assert_eq!(source.parameters.get("major"), Some("2"));
        assert_eq!(source.parameters.get("minor"), Some("4"));
        assert_eq!(source.parameters.get("patch"), Some("1"));
        assert_eq!(source.parameters.get("0"), Some("2.4.1"));
    }

    #[test]
    fn test_merge_from_unlisted_route_is_not_a_source() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .merge("m", "Merge branch 'feature/1.2.3' into main")
            .tag("v0.9.0", "a");

        let resolution = resolve(
            merge_rule(vec![VersionSourceKind::Merge, VersionSourceKind::Tag]),
            &repo,
        )
        .unwrap();
        assert_eq!(resolution.source.commit.sha, "a");
        let merge = &resolution.git_info.commits[0];
        assert_eq!(merge.from_branch_rule.as_deref(), Some("feature"));
    }

    #[test]
    fn test_merge_without_to_is_not_a_source() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .merge("m", "Merge branch 'release/2.0.0'")
            .tag("v1.0.0", "a");

        let resolution = resolve(
            merge_rule(vec![VersionSourceKind::Tag, VersionSourceKind::Merge]),
            &repo,
        )
        .unwrap();
        assert_eq!(resolution.source.commit.sha, "a");
        assert_eq!(resolution.git_info.commits[0].to_branch_rule, None);
    }

    #[test]
    fn test_tag_beats_merge_on_same_commit_when_first() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .merge("m", "Merge branch 'release/2.0.0' into main")
            .tag("v3.0.0", "m");

        let resolution = resolve(
            merge_rule(vec![VersionSourceKind::Tag, VersionSourceKind::Merge]),
            &repo,
        )
        .unwrap();
        assert_eq!(resolution.source.kind, VersionSourceKind::Tag);
        assert_eq!(resolution.source.parameters.get("major"), Some("3"));
    }

    #[test]
    fn test_merge_beats_tag_on_same_commit_when_first() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .merge("m", "Merge branch 'release/2.0.0' into main")
            .tag("v3.0.0", "m");

        let resolution = resolve(
            merge_rule(vec![VersionSourceKind::Merge, VersionSourceKind::Tag]),
            &repo,
        )
        .unwrap();
        assert_eq!(resolution.source.kind, VersionSourceKind::Merge);
        assert_eq!(resolution.source.parameters.get("major"), Some("2"));
        assert!(resolution.source.commit.tag.is_none());
    }

    #[test]
    fn test_full_walk_sees_side_branch_tags() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .side_commit("s", "side work")
            .merge("m", "Merge branch 'feature/x'")
            .tag("v5.0.0", "s")
            .tag("v1.0.0", "a");

        let mut rule = BranchRule::default();
        assert_eq!(resolve(rule.clone(), &repo).unwrap().source.commit.sha, "a");

        rule.version_source.iterate_first_parent_only = false;
        assert_eq!(resolve(rule, &repo).unwrap().source.commit.sha, "s");
    }

    #[test]
    fn test_merge_route_with_own_pattern() {
        let mut repo = MockRepository::new("main");
        repo.commit("a", "initial")
            .merge("m", "Merge branch 'release/7' into main");

        let mut rule = merge_rule(vec![VersionSourceKind::Merge]);
        rule.version_source.merge_match.routes[0].pattern =
            Some(r"release/(?<major>\d+)".to_string());

        let resolution = resolve(rule, &repo).unwrap();
        assert_eq!(resolution.source.parameters.get("major"), Some("7"));
    }
}

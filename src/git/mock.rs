use chrono::{DateTime, Duration, FixedOffset, TimeZone};

use crate::domain::Tag;
use crate::error::Result;
use crate::git::{CommitInfo, CommitIter, Repository};

const MOCK_AUTHOR: &str = "Test User <test@example.com>";

#[derive(Debug, Clone)]
struct MockCommit {
    info: CommitInfo,
    /// False for commits only reachable through a merge's second parent
    first_parent: bool,
}

/// Mock repository for testing without actual git operations
///
/// Commits are added oldest first, the way history is written; the walk
/// returns them newest first. Commits added with [MockRepository::side_commit]
/// are hidden from first-parent walks.
pub struct MockRepository {
    path: String,
    branch: String,
    commits: Vec<MockCommit>,
    tags: Vec<Tag>,
}

impl MockRepository {
    /// Create a new empty mock repository checked out on `branch`
    pub fn new(branch: impl Into<String>) -> Self {
        MockRepository {
            path: "/mock/repo".to_string(),
            branch: branch.into(),
            commits: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Add a plain commit on the first-parent line
    pub fn commit(&mut self, sha: &str, message: &str) -> &mut Self {
        self.push(sha, message, 1, true)
    }

    /// Add a merge commit on the first-parent line
    pub fn merge(&mut self, sha: &str, message: &str) -> &mut Self {
        self.push(sha, message, 2, true)
    }

    /// Add a commit that is only reachable through a merge's second parent
    pub fn side_commit(&mut self, sha: &str, message: &str) -> &mut Self {
        self.push(sha, message, 1, false)
    }

    /// Add a lightweight tag pointing at a commit sha
    pub fn tag(&mut self, name: &str, sha: &str) -> &mut Self {
        self.tags.push(Tag::lightweight(name, sha));
        self
    }

    /// Add an annotated tag pointing at a commit sha
    pub fn annotated_tag(&mut self, name: &str, message: &str, sha: &str) -> &mut Self {
        self.tags.push(Tag::annotated(name, message, sha));
        self
    }

    fn push(&mut self, sha: &str, message: &str, parents: usize, first_parent: bool) -> &mut Self {
        let time = base_time() + Duration::minutes(self.commits.len() as i64);
        self.commits.push(MockCommit {
            info: CommitInfo {
                sha: sha.to_string(),
                message: message.to_string(),
                message_short: message.lines().next().unwrap_or("").to_string(),
                author: MOCK_AUTHOR.to_string(),
                time,
                parent_count: parents,
            },
            first_parent,
        });
        self
    }
}

fn base_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .and_then(|tz| tz.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single())
        .unwrap_or_default()
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new("main")
    }
}

impl Repository for MockRepository {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn current_branch_name(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.clone())
    }

    fn walk_history(&self, first_parent_only: bool) -> Result<CommitIter<'_>> {
        Ok(Box::new(
            self.commits
                .iter()
                .rev()
                .filter(move |c| c.first_parent || !first_parent_only)
                .map(|c| Ok(c.info.clone())),
        ))
    }
}

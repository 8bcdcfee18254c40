use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::git::CommitInfo;

/// A tag found in the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    /// Friendly name, without the `refs/tags/` prefix
    pub name: String,
    pub annotated: bool,
    /// Annotation message; empty for lightweight tags
    pub message: String,
    /// Sha of the commit the tag points at
    pub target: String,
}

impl Tag {
    /// Create a lightweight tag
    pub fn lightweight(name: impl Into<String>, target: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            annotated: false,
            message: String::new(),
            target: target.into(),
        }
    }

    /// Create an annotated tag
    pub fn annotated(
        name: impl Into<String>,
        message: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Tag {
            name: name.into(),
            annotated: true,
            message: message.into(),
            target: target.into(),
        }
    }
}

/// A commit visited while walking history.
///
/// Only the tag and the merge branch-rule names are attached after creation,
/// and only while the commit is being examined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub message_short: String,
    pub author: String,
    pub date: DateTime<FixedOffset>,
    pub is_merge: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_branch_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_branch_rule: Option<String>,
}

impl Commit {
    /// The first seven characters of the sha
    pub fn short_sha(&self) -> &str {
        match self.sha.char_indices().nth(7) {
            Some((idx, _)) => &self.sha[..idx],
            None => &self.sha,
        }
    }
}

impl From<CommitInfo> for Commit {
    fn from(info: CommitInfo) -> Self {
        Commit {
            is_merge: info.parent_count > 1,
            sha: info.sha,
            message: info.message,
            message_short: info.message_short,
            author: info.author,
            date: info.time,
            tag: None,
            from_branch_rule: None,
            to_branch_rule: None,
        }
    }
}

/// Versioning-relevant information about the repository.
#[derive(Debug, Clone, Serialize)]
pub struct GitInfo {
    pub path: String,
    pub branch_name: String,
    /// Commits from HEAD down to and including the version source
    pub commits: Vec<Commit>,
}

impl GitInfo {
    /// The most recent commit, if any was visited
    pub fn head(&self) -> Option<&Commit> {
        self.commits.first()
    }

    /// The branch name after its last `/`
    pub fn short_branch_name(&self) -> &str {
        self.branch_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.branch_name)
    }

    /// Number of commits on top of the version source
    pub fn commits_since_source(&self) -> usize {
        self.commits.len().saturating_sub(1)
    }
}
